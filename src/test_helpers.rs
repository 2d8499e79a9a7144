//! Test helpers for writing deployment configs
//!
//! Configs are built as YAML text, the same way users write them, and
//! either parsed directly or written into a `MockFileSystem`.

#![cfg(test)]

use crate::deployment::Config;
use crate::traits::{FileSystem, MockFileSystem};
use std::path::PathBuf;

/// Default project of configs built by [`ConfigBuilder`]
pub const TEST_PROJECT: &str = "test-project";

/// Builder for one deployment config document
pub struct ConfigBuilder {
    name: Option<String>,
    project: Option<String>,
    description: Option<String>,
    imports: Vec<String>,
    resources: Vec<ResourceBuilder>,
}

/// One entry of the `resources` list
struct ResourceBuilder {
    name: String,
    kind: String,
    properties: Vec<(String, String)>,
}

impl ConfigBuilder {
    /// Create a config named `name` in [`TEST_PROJECT`] with one resource
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            resources: vec![ResourceBuilder {
                name: format!("{}-resource", name),
                kind: "compute.v1.network".to_string(),
                properties: Vec::new(),
            }],
            name: Some(name),
            project: Some(TEST_PROJECT.to_string()),
            description: None,
            imports: Vec::new(),
        }
    }

    /// Set the project
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Leave `project` out so the default project applies
    pub fn without_project(mut self) -> Self {
        self.project = None;
        self
    }

    /// Set the description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Add an import path
    pub fn import(mut self, path: impl Into<String>) -> Self {
        self.imports.push(path.into());
        self
    }

    /// Add a resource
    pub fn resource(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.resources.push(ResourceBuilder {
            name: name.into(),
            kind: kind.into(),
            properties: Vec::new(),
        });
        self
    }

    /// Add a raw YAML property to the last resource
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(resource) = self.resources.last_mut() {
            resource.properties.push((key.into(), value.into()));
        }
        self
    }

    /// Add a property holding `$(out.<token>)` to the last resource
    pub fn reference(self, key: impl Into<String>, token: &str) -> Self {
        self.property(key, format!("$(out.{})", token))
    }

    /// Render the config as YAML
    pub fn build(&self) -> String {
        let mut yaml = String::new();

        if let Some(name) = &self.name {
            yaml.push_str(&format!("name: {}\n", name));
        }
        if let Some(project) = &self.project {
            yaml.push_str(&format!("project: {}\n", project));
        }
        if let Some(description) = &self.description {
            yaml.push_str(&format!("description: {}\n", description));
        }

        if !self.imports.is_empty() {
            yaml.push_str("imports:\n");
            for import in &self.imports {
                yaml.push_str(&format!("  - path: {}\n", import));
            }
        }

        yaml.push_str("resources:\n");
        for resource in &self.resources {
            yaml.push_str(&format!("  - name: {}\n", resource.name));
            yaml.push_str(&format!("    type: {}\n", resource.kind));
            if !resource.properties.is_empty() {
                yaml.push_str("    properties:\n");
                for (key, value) in &resource.properties {
                    yaml.push_str(&format!("      {}: {}\n", key, value));
                }
            }
        }

        yaml
    }

    /// Parse the config as inline YAML
    pub fn config(&self) -> Config {
        Config::parse(&self.build(), None, Some(TEST_PROJECT)).unwrap()
    }

    /// Write the config into the mock filesystem
    pub fn write(&self, fs: &MockFileSystem, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        fs.write(&path, &self.build()).unwrap();
        path
    }
}

/// Write a network, a firewall on that network and a VM using both.
///
/// Files are written in reverse dependency order so loading alone never
/// produces a valid order.
pub fn create_network_stack(fs: &MockFileSystem, dir: &str) -> PathBuf {
    let dir = PathBuf::from(dir);

    ConfigBuilder::new("vm")
        .resource("my-vm", "compute.v1.instance")
        .reference("network", "network.network-resource.selfLink")
        .reference("tags", "firewall.firewall-resource.targetTags")
        .write(fs, dir.join("1-vm.yaml"));

    ConfigBuilder::new("firewall")
        .reference("network", "test-project.network.network-resource.selfLink")
        .write(fs, dir.join("2-firewall.yaml"));

    ConfigBuilder::new("network")
        .property("autoCreateSubnetworks", "false")
        .write(fs, dir.join("3-network.yaml"));

    dir
}

#[test]
fn test_config_builder_roundtrip() {
    let config = ConfigBuilder::new("net")
        .project("p")
        .description("network")
        .import("templates/network.py")
        .resource("extra", "templates/network.py")
        .reference("peer", "other.res.selfLink")
        .config();

    assert_eq!(config.full_name(), "p.net");
    assert_eq!(config.description.as_deref(), Some("network"));
    assert_eq!(config.imports.len(), 1);
    assert_eq!(config.resources.len(), 2);
    assert_eq!(config.find_all_out_refs(), vec!["other.res.selfLink"]);
}
