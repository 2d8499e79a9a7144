//! Deployment Manager configs, their dependency order and execution.

pub mod config;
pub mod config_set;
pub mod gcloud;
pub mod graph;
pub mod loader;
pub mod manager;
pub mod order;
pub mod outputs;
pub mod reference;
pub mod runner;

pub use config::Config;
pub use gcloud::GCloudDeploymentManager;
pub use loader::load_configs;
pub use manager::DeploymentManager;
pub use order::stages_with_existing;
pub use runner::{Action, DeploymentRunner, RunOutcome};

#[cfg(test)]
pub use manager::{DeploymentStatus, MockDeploymentManager};
