use thiserror::Error;

/// Errors raised while loading, ordering and resolving deployment configs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeploymentError {
    /// Config text is not valid YAML or does not match the config shape
    #[error("failed to parse config yaml {source_name}: {message}")]
    MalformedConfig {
        source_name: String,
        message: String,
    },

    /// A required field is absent and could not be defaulted
    #[error("{field} field not defined in config {source_name}")]
    MissingField {
        field: &'static str,
        source_name: String,
    },

    /// Two configs share the same project.name
    #[error("duplicate deployment {0}: more than one config resolves to this name")]
    DuplicateFullName(String),

    /// A $(out.*) token that is not 3 or 4 non-empty segments
    #[error("invalid output reference $(out.{0}): expected [project.]deployment.resource.property")]
    InvalidReference(String),

    /// A $(out.*) token points at a deployment that is not part of the run
    #[error("Could not find config for deployment = {deployment} (referenced by {referenced_by})")]
    UnresolvedReference {
        deployment: String,
        referenced_by: String,
    },

    /// Residual in-degree after the topological sort
    #[error("circular dependencies in graph between: {}", .nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },

    /// The referenced deployment exists but does not expose the output
    #[error("Could not resolve reference $(out.{reference}): deployment {deployment} has no such output")]
    OutputNotFound {
        reference: String,
        deployment: String,
    },

    /// The live outputs lookup itself failed
    #[error("failed to get outputs for deployment {deployment}: {message}")]
    OutputFetch { deployment: String, message: String },

    /// A decoded YAML value outside the supported shapes
    #[error("unexpected yaml element type: {kind}")]
    UnsupportedValueType { kind: &'static str },

    /// The status lookup of a referenced deployment failed
    #[error("failed to get status of deployment {deployment}: {message}")]
    StatusFetch { deployment: String, message: String },

    /// The deployment is in a state where it cannot be changed
    #[error("deployment {deployment} is in {status} state")]
    DeploymentNotReady { deployment: String, status: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_dependency_lists_nodes() {
        let err = DeploymentError::CyclicDependency {
            nodes: vec!["p.a".to_string(), "p.b".to_string()],
        };

        assert_eq!(err.to_string(), "circular dependencies in graph between: p.a, p.b");
    }

    #[test]
    fn test_unresolved_reference_message() {
        let err = DeploymentError::UnresolvedReference {
            deployment: "p.missing".to_string(),
            referenced_by: "p.c".to_string(),
        };

        assert!(err
            .to_string()
            .starts_with("Could not find config for deployment = p.missing"));
    }
}
