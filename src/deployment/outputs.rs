use super::manager::DeploymentManager;
use super::reference::{OUT_REF_PATTERN, Reference};
use crate::error::DeploymentError;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// Outputs of one deployment, keyed by `resource.property`
pub type DeploymentOutputs = HashMap<String, Value>;

/// Outputs of every deployment seen during a run, keyed by full name.
///
/// Deployments executed in this run are inserted by the runner. Anything
/// else is fetched from Deployment Manager the first time it is referenced
/// and cached, including deployments that expose no outputs at all.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    deployments: HashMap<String, DeploymentOutputs>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, full_name: impl Into<String>, outputs: DeploymentOutputs) {
        self.deployments.insert(full_name.into(), outputs);
    }

    pub fn remove(&mut self, full_name: &str) -> Option<DeploymentOutputs> {
        self.deployments.remove(full_name)
    }

    #[allow(dead_code)]
    pub fn get(&self, full_name: &str) -> Option<&DeploymentOutputs> {
        self.deployments.get(full_name)
    }

    #[allow(dead_code)]
    pub fn contains(&self, full_name: &str) -> bool {
        self.deployments.contains_key(full_name)
    }

    /// Value of one reference, fetching the deployment's outputs on a cache miss
    pub fn resolve(
        &mut self,
        reference: &Reference,
        manager: &dyn DeploymentManager,
    ) -> Result<Value, DeploymentError> {
        let full_name = reference.full_name();

        if !self.deployments.contains_key(&full_name) {
            tracing::debug!("Fetching outputs of deployment {}", full_name);
            let fetched = manager
                .get_outputs(&reference.project, &reference.deployment)
                .map_err(|e| DeploymentError::OutputFetch {
                    deployment: full_name.clone(),
                    message: format!("{:#}", e),
                })?;
            self.deployments.insert(full_name.clone(), fetched);
        }

        self.deployments
            .get(&full_name)
            .and_then(|outputs| outputs.get(&reference.output_key()))
            .cloned()
            .ok_or(DeploymentError::OutputNotFound {
                reference: reference.token.clone(),
                deployment: full_name,
            })
    }

    /// Replace every $(out.*) macro inside a decoded YAML value.
    ///
    /// A string that is exactly one macro takes the resolved value as is. A
    /// macro embedded in longer text is spliced in as text. Null, float and
    /// tagged values are rejected.
    pub fn substitute(
        &mut self,
        value: &Value,
        default_project: &str,
        manager: &dyn DeploymentManager,
    ) -> Result<Value, DeploymentError> {
        match value {
            Value::String(text) => self.substitute_string(text, default_project, manager),
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::Number(_) => Err(DeploymentError::UnsupportedValueType { kind: "float" }),
            Value::Mapping(mapping) => {
                let mut substituted = Mapping::with_capacity(mapping.len());
                for (key, item) in mapping {
                    substituted.insert(key.clone(), self.substitute(item, default_project, manager)?);
                }
                Ok(Value::Mapping(substituted))
            }
            Value::Sequence(items) => items
                .iter()
                .map(|item| self.substitute(item, default_project, manager))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Null => Err(DeploymentError::UnsupportedValueType { kind: "null" }),
            Value::Tagged(_) => Err(DeploymentError::UnsupportedValueType { kind: "tagged" }),
        }
    }

    fn substitute_string(
        &mut self,
        text: &str,
        default_project: &str,
        manager: &dyn DeploymentManager,
    ) -> Result<Value, DeploymentError> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(caps) = OUT_REF_PATTERN.captures(rest) {
            let Some(whole) = caps.get(0) else {
                break;
            };
            let reference = Reference::parse(&caps["token"], default_project)?;
            let resolved = self.resolve(&reference, manager)?;

            if rest.len() == text.len() && whole.start() == 0 && whole.end() == text.len() {
                return Ok(resolved);
            }

            result.push_str(&rest[..whole.start()]);
            match resolved {
                Value::String(s) => result.push_str(&s),
                Value::Number(n) => result.push_str(&n.to_string()),
                Value::Bool(b) => result.push_str(&b.to_string()),
                Value::Mapping(_) | Value::Sequence(_) => {
                    return Err(DeploymentError::UnsupportedValueType {
                        kind: "collection embedded in text",
                    });
                }
                Value::Null => return Err(DeploymentError::UnsupportedValueType { kind: "null" }),
                Value::Tagged(_) => {
                    return Err(DeploymentError::UnsupportedValueType { kind: "tagged" });
                }
            }
            rest = &rest[whole.end()..];
        }

        result.push_str(rest);
        Ok(Value::String(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::manager::MockDeploymentManager;

    fn manager() -> MockDeploymentManager {
        MockDeploymentManager::new().with_outputs(
            "p",
            "net",
            &[
                ("network.selfLink", Value::from("global/networks/prod")),
                ("network.mtu", Value::from(1460)),
                (
                    "network.tags",
                    Value::Sequence(vec![Value::from("a"), Value::from("b")]),
                ),
            ],
        )
    }

    #[test]
    fn test_resolve_fetches_once() {
        let manager = manager();
        let mut outputs = Outputs::new();
        let reference = Reference::parse("p.net.network.selfLink", "p").unwrap();

        let first = outputs.resolve(&reference, &manager).unwrap();
        let second = outputs.resolve(&reference, &manager).unwrap();

        assert_eq!(first, Value::from("global/networks/prod"));
        assert_eq!(first, second);
        assert_eq!(manager.fetch_count("p", "net"), 1);
    }

    #[test]
    fn test_resolve_prefers_known_outputs() {
        let manager = MockDeploymentManager::new();
        let mut outputs = Outputs::new();
        let mut known = DeploymentOutputs::new();
        known.insert("vm.ip".to_string(), Value::from("10.0.0.2"));
        outputs.insert("p.vm", known);

        let reference = Reference::parse("vm.vm.ip", "p").unwrap();

        assert_eq!(outputs.resolve(&reference, &manager).unwrap(), Value::from("10.0.0.2"));
        assert_eq!(manager.fetch_count("p", "vm"), 0);
    }

    #[test]
    fn test_resolve_missing_output() {
        let manager = manager();
        let mut outputs = Outputs::new();
        let reference = Reference::parse("p.net.network.missing", "p").unwrap();

        let err = outputs.resolve(&reference, &manager).unwrap_err();

        assert_eq!(
            err,
            DeploymentError::OutputNotFound {
                reference: "p.net.network.missing".to_string(),
                deployment: "p.net".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_caches_empty_outputs() {
        let manager = MockDeploymentManager::new();
        let mut outputs = Outputs::new();
        let reference = Reference::parse("p.empty.r.o", "p").unwrap();

        assert!(outputs.resolve(&reference, &manager).is_err());
        assert!(outputs.resolve(&reference, &manager).is_err());
        assert_eq!(manager.fetch_count("p", "empty"), 1);
    }

    #[test]
    fn test_resolve_fetch_failure() {
        let manager = MockDeploymentManager::new().with_failing_outputs("p", "broken");
        let mut outputs = Outputs::new();
        let reference = Reference::parse("p.broken.r.o", "p").unwrap();

        let err = outputs.resolve(&reference, &manager).unwrap_err();
        assert!(matches!(err, DeploymentError::OutputFetch { deployment, .. } if deployment == "p.broken"));
    }

    #[test]
    fn test_substitute_nested_values() {
        let manager = manager();
        let mut outputs = Outputs::new();
        let value: Value = serde_yaml::from_str(
            r#"
name: vm
properties:
  network: $(out.net.network.selfLink)
  mtu: $(out.p.net.network.mtu)
  tags: $(out.net.network.tags)
  description: "on $(out.net.network.selfLink) with mtu $(out.net.network.mtu)"
  autoDelete: true
  size: 10
  zones:
    - us-east1-b
    - $(out.net.network.selfLink)
"#,
        )
        .unwrap();

        let result = outputs.substitute(&value, "p", &manager).unwrap();

        let properties = &result["properties"];
        assert_eq!(properties["network"], Value::from("global/networks/prod"));
        assert_eq!(properties["mtu"], Value::from(1460));
        assert_eq!(
            properties["tags"],
            Value::Sequence(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(
            properties["description"],
            Value::from("on global/networks/prod with mtu 1460")
        );
        assert_eq!(properties["autoDelete"], Value::from(true));
        assert_eq!(properties["size"], Value::from(10));
        assert_eq!(properties["zones"][1], Value::from("global/networks/prod"));
        assert_eq!(manager.fetch_count("p", "net"), 1);
    }

    #[test]
    fn test_substitute_plain_string_untouched() {
        let manager = MockDeploymentManager::new();
        let mut outputs = Outputs::new();

        let result = outputs
            .substitute(&Value::from("$(ref.vm.selfLink)"), "p", &manager)
            .unwrap();

        assert_eq!(result, Value::from("$(ref.vm.selfLink)"));
        assert_eq!(manager.total_fetches(), 0);
    }

    #[test]
    fn test_substitute_rejects_unsupported_values() {
        let manager = MockDeploymentManager::new();
        let mut outputs = Outputs::new();

        for (yaml, kind) in [("~", "null"), ("1.5", "float"), ("!custom x", "tagged")] {
            let value: Value = serde_yaml::from_str(yaml).unwrap();
            assert_eq!(
                outputs.substitute(&value, "p", &manager),
                Err(DeploymentError::UnsupportedValueType { kind }),
                "{}",
                yaml
            );
        }
    }

    #[test]
    fn test_substitute_rejects_collection_in_text() {
        let manager = manager();
        let mut outputs = Outputs::new();

        let err = outputs
            .substitute(&Value::from("tags: $(out.net.network.tags)"), "p", &manager)
            .unwrap_err();

        assert!(matches!(err, DeploymentError::UnsupportedValueType { .. }));
    }

    #[test]
    fn test_remove_forgets_outputs() {
        let mut outputs = Outputs::new();
        outputs.insert("p.a", DeploymentOutputs::new());

        assert!(outputs.remove("p.a").is_some());
        assert!(!outputs.contains("p.a"));
    }
}
