//! Directed graph of deployment full names and its topological sort.
//!
//! Edges point from a dependency to the deployments that depend on it, so a
//! topological order lists every dependency before its dependents.

use crate::error::DeploymentError;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    /// Traversal order of nodes; append-only
    nodes: Vec<String>,
    /// node -> (dependent -> insertion index)
    outgoing: HashMap<String, HashMap<String, usize>>,
    /// node -> number of unprocessed incoming edges
    incoming: HashMap<String, usize>,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.
    ///
    /// The node list is always appended to, but the edge bookkeeping of an
    /// existing node is left untouched. Returns true if the node was new.
    pub fn add_node(&mut self, name: &str) -> bool {
        self.nodes.push(name.to_string());

        if self.outgoing.contains_key(name) {
            return false;
        }

        self.outgoing.insert(name.to_string(), HashMap::new());
        self.incoming.entry(name.to_string()).or_insert(0);
        true
    }

    /// Add an edge `from -> to`, meaning `from` must come before `to`.
    ///
    /// Fails if `from` has not been added as a node. Adding the same edge
    /// twice keeps the first insertion index and counts it once.
    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        let Some(edges) = self.outgoing.get_mut(from) else {
            return false;
        };

        if edges.contains_key(to) {
            return true;
        }

        let index = edges.len() + 1;
        edges.insert(to.to_string(), index);
        *self.incoming.entry(to.to_string()).or_insert(0) += 1;
        true
    }

    #[allow(dead_code)]
    pub fn node_count(&self) -> usize {
        self.outgoing.len()
    }

    #[allow(dead_code)]
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(HashMap::len).sum()
    }

    #[allow(dead_code)]
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.outgoing
            .get(from)
            .is_some_and(|edges| edges.contains_key(to))
    }

    /// Dependents of `node` in edge insertion order
    fn children(&self, node: &str) -> Vec<&str> {
        let Some(edges) = self.outgoing.get(node) else {
            return Vec::new();
        };

        let mut children: Vec<(&str, usize)> =
            edges.iter().map(|(name, &i)| (name.as_str(), i)).collect();
        children.sort_by_key(|&(_, i)| i);
        children.into_iter().map(|(name, _)| name).collect()
    }

    /// Kahn's algorithm. Returns nodes in execution order.
    #[allow(dead_code)]
    pub fn sort_topologically(&self) -> Result<Vec<String>, DeploymentError> {
        Ok(self.sort_into_stages()?.concat())
    }

    /// Kahn's algorithm, grouping nodes by the round they became free.
    ///
    /// The first stage holds every node without dependencies in node-list
    /// order. Each later stage holds the nodes freed by the previous stage,
    /// in the order they were freed. Flattening the stages gives the FIFO
    /// queue order of a plain Kahn's traversal.
    pub fn sort_into_stages(&self) -> Result<Vec<Vec<String>>, DeploymentError> {
        let mut incoming = self.incoming.clone();
        let mut stages = Vec::new();

        let mut roots: Vec<String> = Vec::new();
        for node in &self.nodes {
            if incoming.get(node.as_str()) == Some(&0) && !roots.contains(node) {
                roots.push(node.clone());
            }
        }

        let mut queue: VecDeque<String> = roots.iter().cloned().collect();
        if !roots.is_empty() {
            stages.push(roots);
        }

        let mut next_stage = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.children(&current) {
                let Some(count) = incoming.get_mut(child) else {
                    continue;
                };
                *count -= 1;
                if *count == 0 {
                    next_stage.push(child.to_string());
                }
            }

            if queue.is_empty() && !next_stage.is_empty() {
                queue.extend(next_stage.iter().cloned());
                stages.push(std::mem::take(&mut next_stage));
            }
        }

        let remaining: usize = incoming.values().sum();
        if remaining > 0 {
            let mut nodes: Vec<String> = incoming
                .into_iter()
                .filter(|&(_, count)| count > 0)
                .map(|(name, _)| name)
                .collect();
            nodes.sort();
            return Err(DeploymentError::CyclicDependency { nodes });
        }

        Ok(stages)
    }
}
