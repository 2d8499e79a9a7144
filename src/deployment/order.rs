use super::config::Config;
use super::config_set::ConfigSet;
use super::graph::DirectedGraph;
use super::manager::{DeploymentManager, DeploymentStatus};
use crate::error::DeploymentError;

/// Configs in execution order: every dependency before its dependents.
///
/// Fails with `UnresolvedReference` when a config references a deployment
/// that is not in the set, and with `CyclicDependency` when there is no
/// valid order.
#[allow(dead_code)]
pub fn order(configs: &ConfigSet) -> Result<Vec<Config>, DeploymentError> {
    Ok(stages(configs)?.concat())
}

/// Configs grouped into stages. Configs within one stage do not depend on
/// each other.
#[allow(dead_code)]
pub fn stages(configs: &ConfigSet) -> Result<Vec<Vec<Config>>, DeploymentError> {
    let graph = build_graph(configs, |_| Ok(false))?;
    collect_stages(configs, &graph)
}

/// Like [`order`], but references to deployments outside the set are
/// accepted when Deployment Manager reports them as `DONE`.
///
/// A referenced deployment that is pending, running or failed is
/// `DeploymentNotReady`; one that does not exist is `UnresolvedReference`.
#[allow(dead_code)]
pub fn order_with_existing(
    configs: &ConfigSet,
    manager: &dyn DeploymentManager,
) -> Result<Vec<Config>, DeploymentError> {
    Ok(stages_with_existing(configs, manager)?.concat())
}

/// Like [`stages`], but references to deployments outside the set are
/// accepted when Deployment Manager reports them as `DONE`.
pub fn stages_with_existing(
    configs: &ConfigSet,
    manager: &dyn DeploymentManager,
) -> Result<Vec<Vec<Config>>, DeploymentError> {
    let graph = build_graph(configs, |full_name| {
        let Some((project, deployment)) = full_name.rsplit_once('.') else {
            return Ok(false);
        };

        let status = manager
            .get_status(project, deployment)
            .map_err(|e| DeploymentError::StatusFetch {
                deployment: full_name.to_string(),
                message: format!("{:#}", e),
            })?;
        tracing::debug!("Referenced deployment {} is {}", full_name, status);

        match status {
            DeploymentStatus::Done => Ok(true),
            DeploymentStatus::NotFound => Ok(false),
            DeploymentStatus::Pending | DeploymentStatus::Running | DeploymentStatus::Error => {
                Err(DeploymentError::DeploymentNotReady {
                    deployment: full_name.to_string(),
                    status: status.to_string(),
                })
            }
        }
    })?;

    collect_stages(configs, &graph)
}

/// Nodes in set order, one edge per distinct dependency.
///
/// `exists` decides whether a reference to a deployment outside the set is
/// satisfied without ordering it.
fn build_graph<F>(configs: &ConfigSet, exists: F) -> Result<DirectedGraph, DeploymentError>
where
    F: Fn(&str) -> Result<bool, DeploymentError>,
{
    let mut graph = DirectedGraph::new();
    for config in configs.iter() {
        graph.add_node(&config.full_name());
    }

    for config in configs.iter() {
        let dependent = config.full_name();

        for dependency in config.find_dependencies_with(configs, &exists)? {
            let dependency = dependency.full_name();
            if !graph.add_edge(&dependency, &dependent) {
                return Err(DeploymentError::UnresolvedReference {
                    deployment: dependency,
                    referenced_by: dependent,
                });
            }
        }
    }

    Ok(graph)
}

fn collect_stages(
    configs: &ConfigSet,
    graph: &DirectedGraph,
) -> Result<Vec<Vec<Config>>, DeploymentError> {
    graph
        .sort_into_stages()?
        .into_iter()
        .map(|stage| {
            stage
                .iter()
                .map(|full_name| {
                    configs.get(full_name).cloned().ok_or_else(|| {
                        DeploymentError::UnresolvedReference {
                            deployment: full_name.clone(),
                            referenced_by: full_name.clone(),
                        }
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::manager::MockDeploymentManager;

    fn config(name: &str, data: &str) -> Config {
        let yaml = format!("name: {}\nproject: p\nresources:\n  - name: r\n    type: t\n{}", name, data);
        Config::parse(&yaml, None, None).unwrap()
    }

    fn names(configs: &[Config]) -> Vec<String> {
        configs.iter().map(|c| c.name.clone()).collect()
    }

    fn set(configs: Vec<Config>) -> ConfigSet {
        configs.into_iter().collect()
    }

    #[test]
    fn test_dependency_ordered_first() {
        let a = config("a", "");
        let b = config("b", "    properties:\n      net: $(out.p.a.r.o)");

        let ordered = order(&set(vec![b, a])).unwrap();

        assert_eq!(names(&ordered), vec!["a", "b"]);
    }

    #[test]
    fn test_mutual_references_are_a_cycle() {
        let a = config("a", "    properties:\n      net: $(out.b.r.o)");
        let b = config("b", "    properties:\n      net: $(out.a.r.o)");

        let err = order(&set(vec![a, b])).unwrap_err();

        assert_eq!(
            err,
            DeploymentError::CyclicDependency {
                nodes: vec!["p.a".to_string(), "p.b".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_dependency_fails() {
        let c = config("c", "    properties:\n      net: $(out.p.missing.r.o)");

        let err = order(&set(vec![c])).unwrap_err();

        assert_eq!(
            err,
            DeploymentError::UnresolvedReference {
                deployment: "p.missing".to_string(),
                referenced_by: "p.c".to_string(),
            }
        );
    }

    #[test]
    fn test_independent_configs_keep_load_order() {
        let configs = set(vec![config("x", ""), config("y", ""), config("z", "")]);

        assert_eq!(names(&order(&configs).unwrap()), vec!["x", "y", "z"]);
        assert_eq!(names(&order(&configs).unwrap()), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_stages() {
        let a = config("a", "");
        let b = config("b", "    properties:\n      x: $(out.a.r.o)");
        let c = config("c", "    properties:\n      x: $(out.a.r.o)");
        let d = config(
            "d",
            "    properties:\n      x: $(out.b.r.o)\n      y: $(out.c.r.o)",
        );

        let stages = stages(&set(vec![d, c, b, a])).unwrap();
        let stage_names: Vec<Vec<String>> = stages.iter().map(|s| names(s)).collect();

        assert_eq!(
            stage_names,
            vec![vec!["a"], vec!["c", "b"], vec!["d"]]
        );
    }

    #[test]
    fn test_repeated_reference_is_one_edge() {
        let a = config("a", "");
        let b = config(
            "b",
            "    properties:\n      x: $(out.a.r.o)\n      y: $(out.a.r.other)",
        );

        assert_eq!(names(&order(&set(vec![b, a])).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let a = config("a", "    properties:\n      x: $(out.a.r.o)");

        assert!(matches!(
            order(&set(vec![a])),
            Err(DeploymentError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn test_invalid_reference_fails() {
        let a = config("a", "    properties:\n      x: $(out.r.o)");

        assert!(matches!(
            order(&set(vec![a])),
            Err(DeploymentError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_order_with_existing_accepts_done_deployments() {
        let b = config("b", "    properties:\n      net: $(out.p.live.r.o)");
        let manager = MockDeploymentManager::new().with_status("p", "live", DeploymentStatus::Done);

        let ordered = order_with_existing(&set(vec![b]), &manager).unwrap();

        assert_eq!(names(&ordered), vec!["b"]);
    }

    #[test]
    fn test_order_with_existing_rejects_missing_deployments() {
        let b = config("b", "    properties:\n      net: $(out.p.live.r.o)");
        let manager = MockDeploymentManager::new();

        assert_eq!(
            order_with_existing(&set(vec![b]), &manager).unwrap_err(),
            DeploymentError::UnresolvedReference {
                deployment: "p.live".to_string(),
                referenced_by: "p.b".to_string(),
            }
        );
    }

    #[test]
    fn test_order_with_existing_rejects_busy_deployments() {
        for status in [DeploymentStatus::Pending, DeploymentStatus::Running, DeploymentStatus::Error] {
            let b = config("b", "    properties:\n      net: $(out.p.live.r.o)");
            let manager = MockDeploymentManager::new().with_status("p", "live", status);

            assert_eq!(
                order_with_existing(&set(vec![b]), &manager).unwrap_err(),
                DeploymentError::DeploymentNotReady {
                    deployment: "p.live".to_string(),
                    status: status.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_order_with_existing_reports_status_failure() {
        let b = config("b", "    properties:\n      net: $(out.p.live.r.o)");
        let manager = MockDeploymentManager::new().with_failing_status("p", "live");

        let err = order_with_existing(&set(vec![b]), &manager).unwrap_err();

        match err {
            DeploymentError::StatusFetch { deployment, message } => {
                assert_eq!(deployment, "p.live");
                assert!(message.contains("code=403"), "{}", message);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
