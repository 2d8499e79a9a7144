use super::manager::{DeploymentManager, DeploymentStatus};
use super::outputs::DeploymentOutputs;
use crate::traits::CommandExecutor;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;
use std::sync::Arc;

const GCLOUD: &str = "gcloud";

/// Deployment Manager backend driving the `gcloud` CLI
pub struct GCloudDeploymentManager {
    command: Arc<dyn CommandExecutor>,
}

/// Captured result of one gcloud call
struct GCloudOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GCloudDeploymentManager {
    pub fn new(command: Arc<dyn CommandExecutor>) -> Self {
        Self { command }
    }

    /// Run gcloud with YAML output format
    fn run(&self, args: &[&str]) -> Result<GCloudOutput> {
        let mut args = args.to_vec();
        args.extend(["--format", "yaml"]);

        tracing::debug!("{} {}", GCLOUD, args.join(" "));

        let output = self
            .command
            .execute(GCLOUD, &args, Path::new("."))
            .context("Failed to execute gcloud. Is the Cloud SDK installed and on PATH?")?;

        Ok(GCloudOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run gcloud and fail on a non-zero exit
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;

        if !output.success {
            tracing::debug!("gcloud stderr: {}", output.stderr);
            anyhow::bail!(
                "gcloud {} failed: {}",
                args.join(" "),
                output.stderr.trim()
            );
        }

        Ok(output.stdout)
    }

    fn create_or_update(
        &self,
        verb: &str,
        project: &str,
        deployment: &str,
        config_file: &Path,
        preview: bool,
    ) -> Result<String> {
        let config_file = config_file.to_string_lossy();
        let mut args = vec![
            "deployment-manager",
            "deployments",
            verb,
            deployment,
            "--config",
            config_file.as_ref(),
            "--project",
            project,
        ];
        if preview {
            args.push("--preview");
        }

        self.run_checked(&args)
    }
}

impl DeploymentManager for GCloudDeploymentManager {
    fn get_outputs(&self, project: &str, deployment: &str) -> Result<DeploymentOutputs> {
        let data = self
            .run_checked(&[
                "deployment-manager",
                "manifests",
                "describe",
                "--deployment",
                deployment,
                "--project",
                project,
            ])
            .with_context(|| format!("Failed to get manifest of deployment {}.{}", project, deployment))?;

        parse_outputs(&data)
    }

    fn get_status(&self, project: &str, deployment: &str) -> Result<DeploymentStatus> {
        let output = self.run(&[
            "deployment-manager",
            "deployments",
            "describe",
            deployment,
            "--project",
            project,
        ])?;

        if !output.success {
            if output.stderr.contains("code=404") || output.stdout.contains("code=404") {
                return Ok(DeploymentStatus::NotFound);
            }
            anyhow::bail!(
                "Failed to describe deployment {}.{}: {}",
                project,
                deployment,
                output.stderr.trim()
            );
        }

        parse_status(&output.stdout)
    }

    fn create(&self, project: &str, deployment: &str, config_file: &Path, preview: bool) -> Result<String> {
        self.create_or_update("create", project, deployment, config_file, preview)
    }

    fn update(&self, project: &str, deployment: &str, config_file: &Path, preview: bool) -> Result<String> {
        self.create_or_update("update", project, deployment, config_file, preview)
    }

    fn delete(&self, project: &str, deployment: &str) -> Result<String> {
        self.run_checked(&[
            "deployment-manager",
            "deployments",
            "delete",
            deployment,
            "--project",
            project,
            "-q",
        ])
    }

    fn apply_preview(&self, project: &str, deployment: &str) -> Result<String> {
        self.run_checked(&[
            "deployment-manager",
            "deployments",
            "update",
            deployment,
            "--project",
            project,
        ])
    }

    fn cancel_preview(&self, project: &str, deployment: &str) -> Result<String> {
        self.run_checked(&[
            "deployment-manager",
            "deployments",
            "cancel-preview",
            deployment,
            "--project",
            project,
        ])
    }

    fn default_project(&self) -> Result<Option<String>> {
        let data = self.run_checked(&["config", "list"])?;

        #[derive(Deserialize)]
        struct ConfigList {
            core: Option<CoreSection>,
        }

        #[derive(Deserialize)]
        struct CoreSection {
            project: Option<String>,
        }

        let list: ConfigList =
            serde_yaml::from_str(&data).context("Failed to parse gcloud config list output")?;

        Ok(list
            .core
            .and_then(|core| core.project)
            .filter(|p| !p.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct ManifestDescription {
    layout: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Layout {
    #[serde(default)]
    resources: Vec<LayoutResource>,
}

#[derive(Debug, Deserialize)]
struct LayoutResource {
    name: String,
    #[serde(default)]
    outputs: Vec<LayoutOutput>,
}

#[derive(Debug, Deserialize)]
struct LayoutOutput {
    name: String,
    #[serde(rename = "finalValue")]
    final_value: Option<Value>,
}

/// Parse `manifests describe` output into `resource.output -> value`.
///
/// The manifest's `layout` field is itself a YAML document.
pub fn parse_outputs(data: &str) -> Result<DeploymentOutputs> {
    let manifest: ManifestDescription =
        serde_yaml::from_str(data).context("Failed to parse deployment manifest")?;

    let Some(layout) = manifest.layout else {
        return Ok(DeploymentOutputs::new());
    };

    let layout: Layout =
        serde_yaml::from_str(&layout).context("Failed to parse deployment manifest layout")?;

    let mut outputs = DeploymentOutputs::new();
    for resource in layout.resources {
        for output in resource.outputs {
            if let Some(value) = output.final_value {
                outputs.insert(format!("{}.{}", resource.name, output.name), value);
            }
        }
    }

    Ok(outputs)
}

#[derive(Debug, Deserialize)]
struct DeploymentDescription {
    deployment: DescribedDeployment,
}

#[derive(Debug, Deserialize)]
struct DescribedDeployment {
    operation: Option<Operation>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    status: Option<String>,
    error: Option<Value>,
}

/// Parse `deployments describe` output into a status
pub fn parse_status(data: &str) -> Result<DeploymentStatus> {
    let description: DeploymentDescription =
        serde_yaml::from_str(data).context("Failed to parse deployment description")?;

    let Some(operation) = description.deployment.operation else {
        return Ok(DeploymentStatus::Error);
    };

    if operation.error.is_some_and(|e| !e.is_null()) {
        return Ok(DeploymentStatus::Error);
    }

    Ok(match operation.status.as_deref() {
        Some("DONE") => DeploymentStatus::Done,
        Some("PENDING") => DeploymentStatus::Pending,
        Some("RUNNING") => DeploymentStatus::Running,
        _ => DeploymentStatus::Error,
    })
}
