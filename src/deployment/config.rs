use super::config_set::ConfigSet;
use super::manager::DeploymentManager;
use super::outputs::Outputs;
use super::reference::{self, Reference};
use crate::error::DeploymentError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Deployment names are limited to 63 characters by Deployment Manager
const MAX_DEPLOYMENT_NAME_LEN: usize = 63;

lazy_static! {
    static ref LEADING_INVALID: Regex = Regex::new(r"^[-0-9]*").unwrap();
    static ref TRAILING_DASHES: Regex = Regex::new(r"-*$").unwrap();
}

/// An `imports` entry of a deployment config
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Import {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub path: String,
}

/// The YAML shape of a deployment config file
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    name: Option<String>,
    project: Option<String>,
    description: Option<String>,
    #[serde(default)]
    imports: Vec<Import>,
    #[serde(default)]
    resources: Vec<Mapping>,
}

/// What gets handed to `gcloud deployment-manager` after rendering
#[derive(Debug, Serialize)]
struct RenderedDocument {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    imports: Vec<Import>,
    resources: Vec<Value>,
}

/// One deployment unit, parsed from a config YAML document
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Deployment name, unique within `project`
    pub name: String,
    /// GCP project id
    pub project: String,
    pub description: Option<String>,
    pub imports: Vec<Import>,
    pub resources: Vec<Mapping>,
    data: String,
    file: Option<PathBuf>,
}

impl Config {
    /// Parse a config document.
    ///
    /// A missing `name` is derived from `file` when there is one. A missing
    /// `project` falls back to `default_project`.
    pub fn parse(
        data: &str,
        file: Option<&Path>,
        default_project: Option<&str>,
    ) -> Result<Self, DeploymentError> {
        let source_name = file
            .map(|f| f.display().to_string())
            .unwrap_or_else(|| data.to_string());

        let document: ConfigDocument =
            serde_yaml::from_str(data).map_err(|e| DeploymentError::MalformedConfig {
                source_name: source_name.clone(),
                message: e.to_string(),
            })?;

        let name = match document.name.filter(|n| !n.is_empty()) {
            Some(name) => name,
            None => file
                .map(deployment_name_from_file)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| DeploymentError::MissingField {
                    field: "name",
                    source_name: source_name.clone(),
                })?,
        };

        let project = document
            .project
            .filter(|p| !p.is_empty())
            .or_else(|| default_project.map(str::to_string))
            .ok_or(DeploymentError::MissingField {
                field: "project",
                source_name,
            })?;

        Ok(Self {
            name,
            project,
            description: document.description,
            imports: document.imports,
            resources: document.resources,
            data: data.to_string(),
            file: file.map(clean_path),
        })
    }

    /// `project.name`, the key of this config in the dependency graph
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.project, self.name)
    }

    /// Raw config text
    #[allow(dead_code)]
    pub fn data(&self) -> &str {
        &self.data
    }

    #[allow(dead_code)]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// File path for file backed configs, the YAML text otherwise
    pub fn source(&self) -> String {
        match &self.file {
            Some(file) => file.display().to_string(),
            None => self.data.clone(),
        }
    }

    /// Directory relative imports are resolved against
    pub fn dir(&self) -> PathBuf {
        let base = self
            .file
            .as_ref()
            .and_then(|f| f.parent())
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match std::path::absolute(&base) {
            Ok(abs) => abs,
            Err(_) => base,
        }
    }

    /// Token bodies of all $(out.*) macros, duplicates kept
    #[allow(dead_code)]
    pub fn find_all_out_refs(&self) -> Vec<String> {
        reference::find_tokens(&self.data)
    }

    /// All $(out.*) macros parsed against this config's project
    pub fn references(&self) -> Result<Vec<Reference>, DeploymentError> {
        reference::extract_references(&self.data, &self.project)
    }

    /// Configs this one references, each once, in order of first reference
    #[allow(dead_code)]
    pub fn find_all_dependencies<'a>(
        &self,
        configs: &'a ConfigSet,
    ) -> Result<Vec<&'a Config>, DeploymentError> {
        self.find_dependencies_with(configs, |_| Ok(false))
    }

    /// Like [`Config::find_all_dependencies`], but a reference to a deployment
    /// outside `configs` is dropped when `exists` accepts its full name.
    ///
    /// Errors returned by `exists` are passed through as is.
    pub fn find_dependencies_with<'a, F>(
        &self,
        configs: &'a ConfigSet,
        exists: F,
    ) -> Result<Vec<&'a Config>, DeploymentError>
    where
        F: Fn(&str) -> Result<bool, DeploymentError>,
    {
        let mut seen = HashSet::new();
        let mut dependencies = Vec::new();

        for reference in self.references()? {
            let full_name = reference.full_name();
            if !seen.insert(full_name.clone()) {
                continue;
            }

            match configs.get(&full_name) {
                Some(dependency) => {
                    tracing::debug!("Adding dependency {} -> {}", self.full_name(), full_name);
                    dependencies.push(dependency);
                }
                None => {
                    if !exists(&full_name)? {
                        return Err(DeploymentError::UnresolvedReference {
                            deployment: full_name,
                            referenced_by: self.full_name(),
                        });
                    }
                    tracing::debug!("{} references existing deployment {}", self.full_name(), full_name);
                }
            }
        }

        Ok(dependencies)
    }

    /// Render the YAML submitted to Deployment Manager.
    ///
    /// Imports become absolute paths, resource types pointing at a moved
    /// import follow it, and every $(out.*) macro is replaced by its value.
    /// `name`, `project` and `description` are dropped.
    pub fn render(
        &self,
        outputs: &mut Outputs,
        manager: &dyn DeploymentManager,
    ) -> Result<String, DeploymentError> {
        let (imports, moved) = self.absolute_imports();

        let mut resources = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            let mut resource = resource.clone();
            if let Some(Value::String(kind)) = resource.get_mut("type")
                && let Some(new_path) = moved.get(kind.as_str())
            {
                *kind = new_path.clone();
            }
            resources.push(outputs.substitute(&Value::Mapping(resource), &self.project, manager)?);
        }

        let document = RenderedDocument {
            imports,
            resources,
        };

        serde_yaml::to_string(&document).map_err(|e| DeploymentError::MalformedConfig {
            source_name: self.source(),
            message: e.to_string(),
        })
    }

    /// Imports with absolute paths, plus old path -> new path for the ones that moved
    fn absolute_imports(&self) -> (Vec<Import>, HashMap<String, String>) {
        let dir = self.dir();
        let mut moved = HashMap::new();

        let imports = self
            .imports
            .iter()
            .map(|import| {
                let new_path = reparent_path(&dir, &import.path);
                if new_path != import.path {
                    moved.insert(import.path.clone(), new_path.clone());
                }
                Import {
                    name: import.name.clone(),
                    path: new_path,
                }
            })
            .collect();

        (imports, moved)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Resolve an import path against the directory of its config file
pub fn reparent_path(base_dir: &Path, file: &str) -> String {
    let path = Path::new(file);
    if path.is_absolute() {
        return file.to_string();
    }

    clean_path(&base_dir.join(path)).display().to_string()
}

/// Derive a valid deployment name from a config file path.
///
/// Names must match `[a-z]([-a-z0-9]*[a-z0-9])?` and be at most 63 characters.
pub fn deployment_name_from_file(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let truncated: String = stem.chars().take(MAX_DEPLOYMENT_NAME_LEN).collect();
    let name = truncated.replace('_', "-");
    let name = LEADING_INVALID.replace(&name, "");
    TRAILING_DASHES.replace(&name, "").into_owned()
}

/// Lexically remove `.` and `..` components
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }

    cleaned
}
