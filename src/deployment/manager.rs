use super::outputs::DeploymentOutputs;
use anyhow::Result;
use std::fmt;
use std::path::Path;

/// State of a deployment as reported by Deployment Manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    Done,
    Pending,
    Running,
    NotFound,
    Error,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentStatus::Done => "DONE",
            DeploymentStatus::Pending => "PENDING",
            DeploymentStatus::Running => "RUNNING",
            DeploymentStatus::NotFound => "NOT_FOUND",
            DeploymentStatus::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

/// Trait for the Deployment Manager backend, allowing for mocking in tests
pub trait DeploymentManager: Send + Sync {
    /// Outputs of a deployment, keyed by `resource.output`
    fn get_outputs(&self, project: &str, deployment: &str) -> Result<DeploymentOutputs>;

    fn get_status(&self, project: &str, deployment: &str) -> Result<DeploymentStatus>;

    /// Create a deployment from a rendered config file
    fn create(&self, project: &str, deployment: &str, config_file: &Path, preview: bool) -> Result<String>;

    /// Update a deployment from a rendered config file
    fn update(&self, project: &str, deployment: &str, config_file: &Path, preview: bool) -> Result<String>;

    fn delete(&self, project: &str, deployment: &str) -> Result<String>;

    /// Apply a previewed create or update
    fn apply_preview(&self, project: &str, deployment: &str) -> Result<String>;

    /// Discard a previewed create or update
    fn cancel_preview(&self, project: &str, deployment: &str) -> Result<String>;

    /// Project configured as the gcloud default, if any
    fn default_project(&self) -> Result<Option<String>>;
}

#[cfg(test)]
pub use mock::MockDeploymentManager;

#[cfg(test)]
mod mock {
    use super::*;
    use serde_yaml::Value;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// In-memory Deployment Manager recording every call
    #[derive(Default)]
    pub struct MockDeploymentManager {
        outputs: HashMap<String, DeploymentOutputs>,
        statuses: Mutex<HashMap<String, DeploymentStatus>>,
        failing_outputs: HashSet<String>,
        failing_statuses: HashSet<String>,
        failing_deletes: HashSet<String>,
        default_project: Option<String>,
        fetches: Mutex<HashMap<String, usize>>,
        calls: Mutex<Vec<String>>,
    }

    fn key(project: &str, deployment: &str) -> String {
        format!("{}.{}", project, deployment)
    }

    impl MockDeploymentManager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_outputs(mut self, project: &str, deployment: &str, outputs: &[(&str, Value)]) -> Self {
            self.outputs.insert(
                key(project, deployment),
                outputs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            self
        }

        pub fn with_status(self, project: &str, deployment: &str, status: DeploymentStatus) -> Self {
            self.statuses
                .lock()
                .unwrap()
                .insert(key(project, deployment), status);
            self
        }

        pub fn with_failing_outputs(mut self, project: &str, deployment: &str) -> Self {
            self.failing_outputs.insert(key(project, deployment));
            self
        }

        pub fn with_failing_status(mut self, project: &str, deployment: &str) -> Self {
            self.failing_statuses.insert(key(project, deployment));
            self
        }

        pub fn with_failing_delete(mut self, project: &str, deployment: &str) -> Self {
            self.failing_deletes.insert(key(project, deployment));
            self
        }

        pub fn with_default_project(mut self, project: &str) -> Self {
            self.default_project = Some(project.to_string());
            self
        }

        pub fn fetch_count(&self, project: &str, deployment: &str) -> usize {
            self.fetches
                .lock()
                .unwrap()
                .get(&key(project, deployment))
                .copied()
                .unwrap_or(0)
        }

        pub fn total_fetches(&self) -> usize {
            self.fetches.lock().unwrap().values().sum()
        }

        /// Calls in the form "create p.name", "delete p.name", ...
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &str, project: &str, deployment: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", call, key(project, deployment)));
        }

        fn set_status(&self, project: &str, deployment: &str, status: DeploymentStatus) {
            self.statuses
                .lock()
                .unwrap()
                .insert(key(project, deployment), status);
        }
    }

    impl DeploymentManager for MockDeploymentManager {
        fn get_outputs(&self, project: &str, deployment: &str) -> Result<DeploymentOutputs> {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(key(project, deployment))
                .or_insert(0) += 1;

            if self.failing_outputs.contains(&key(project, deployment)) {
                anyhow::bail!("ResponseError: code=403, message=forbidden");
            }

            Ok(self
                .outputs
                .get(&key(project, deployment))
                .cloned()
                .unwrap_or_default())
        }

        fn get_status(&self, project: &str, deployment: &str) -> Result<DeploymentStatus> {
            if self.failing_statuses.contains(&key(project, deployment)) {
                anyhow::bail!("ResponseError: code=403, message=permission denied");
            }

            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(&key(project, deployment))
                .copied()
                .unwrap_or(DeploymentStatus::NotFound))
        }

        fn create(&self, project: &str, deployment: &str, _config_file: &Path, preview: bool) -> Result<String> {
            self.record(if preview { "create-preview" } else { "create" }, project, deployment);
            self.set_status(project, deployment, DeploymentStatus::Done);
            Ok(String::new())
        }

        fn update(&self, project: &str, deployment: &str, _config_file: &Path, preview: bool) -> Result<String> {
            self.record(if preview { "update-preview" } else { "update" }, project, deployment);
            Ok(String::new())
        }

        fn delete(&self, project: &str, deployment: &str) -> Result<String> {
            self.record("delete", project, deployment);
            if self.failing_deletes.contains(&key(project, deployment)) {
                anyhow::bail!("failed to delete {}", key(project, deployment));
            }
            self.set_status(project, deployment, DeploymentStatus::NotFound);
            Ok(String::new())
        }

        fn apply_preview(&self, project: &str, deployment: &str) -> Result<String> {
            self.record("apply-preview", project, deployment);
            Ok(String::new())
        }

        fn cancel_preview(&self, project: &str, deployment: &str) -> Result<String> {
            self.record("cancel-preview", project, deployment);
            Ok(String::new())
        }

        fn default_project(&self) -> Result<Option<String>> {
            Ok(self.default_project.clone())
        }
    }
}
