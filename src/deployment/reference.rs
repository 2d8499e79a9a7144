use crate::error::DeploymentError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    /// Matches $(out.project.deployment.resource.property) and $(out.deployment.resource.property)
    pub static ref OUT_REF_PATTERN: Regex =
        Regex::new(r"\$\(out\.(?P<token>[-.a-zA-Z0-9]+)\)").unwrap();
}

/// A parsed cross-deployment output reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Token body as written between `$(out.` and `)`
    pub token: String,
    pub project: String,
    pub deployment: String,
    pub resource: String,
    pub property: String,
}

impl Reference {
    /// Parse a token body. Three segment tokens take `default_project`.
    pub fn parse(token: &str, default_project: &str) -> Result<Self, DeploymentError> {
        let segments: Vec<&str> = token.split('.').collect();

        if segments.iter().any(|s| s.is_empty()) {
            return Err(DeploymentError::InvalidReference(token.to_string()));
        }

        let (project, deployment, resource, property) = match segments.as_slice() {
            [deployment, resource, property] => (default_project, *deployment, *resource, *property),
            [project, deployment, resource, property] => (*project, *deployment, *resource, *property),
            _ => return Err(DeploymentError::InvalidReference(token.to_string())),
        };

        Ok(Self {
            token: token.to_string(),
            project: project.to_string(),
            deployment: deployment.to_string(),
            resource: resource.to_string(),
            property: property.to_string(),
        })
    }

    /// Full name of the referenced deployment: `project.deployment`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.project, self.deployment)
    }

    /// Key into the referenced deployment's outputs: `resource.property`
    pub fn output_key(&self) -> String {
        format!("{}.{}", self.resource, self.property)
    }

    /// The macro text as it appears in config source
    pub fn placeholder(&self) -> String {
        format!("$(out.{})", self.token)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.placeholder())
    }
}

/// Token bodies of every $(out.*) macro in `raw`, in order of appearance
pub fn find_tokens(raw: &str) -> Vec<String> {
    OUT_REF_PATTERN
        .captures_iter(raw)
        .map(|caps| caps["token"].to_string())
        .collect()
}

/// Parse every $(out.*) macro in `raw` into a [`Reference`]
pub fn extract_references(raw: &str, default_project: &str) -> Result<Vec<Reference>, DeploymentError> {
    find_tokens(raw)
        .iter()
        .map(|token| Reference::parse(token, default_project))
        .collect()
}
