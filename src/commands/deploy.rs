use crate::context::Context;
use crate::deployment::{Action, Config, DeploymentRunner, RunOutcome, load_configs, stages_with_existing};
use anyhow::{Context as AnyhowContext, Result};
use serde::Serialize;

/// Options shared by create, update, apply and delete
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Project for configs without one; the gcloud default when unset
    pub project: Option<String>,
    pub preview: bool,
    pub show_stages: bool,
    /// Stage listing format: text (default), yaml or json
    pub format: Option<String>,
    /// Config files, directories, globs or inline YAML
    pub configs: Vec<String>,
}

/// One row of the stage listing
#[derive(Debug, Serialize)]
struct StageEntry {
    project: String,
    deployment: String,
    source: String,
}

impl From<&Config> for StageEntry {
    fn from(config: &Config) -> Self {
        Self {
            project: config.project.clone(),
            deployment: config.name.clone(),
            source: config.source(),
        }
    }
}

/// Handles the create/update/apply/delete commands
pub struct DeployCommand;

impl DeployCommand {
    /// Load, order and run (or just show) the given configs
    pub fn execute(ctx: &Context, action: Action, options: &DeployOptions) -> Result<()> {
        let project = Self::resolve_project(ctx, options.project.as_deref());

        let summary = format!(
            "{} deployment(s), configs {:?}, project {}",
            action,
            options.configs,
            project.as_deref().unwrap_or("<none>")
        );
        // stdout carries nothing but the document for yaml and json listings
        if options.show_stages && options.format.as_deref().is_some_and(|f| f != "text") {
            tracing::info!("{}", summary);
        } else {
            ctx.output.info(&summary);
        }

        let configs = load_configs(&*ctx.fs, &options.configs, project.as_deref())
            .context("Failed to load configs")?;

        let mut stages = stages_with_existing(&configs, ctx.deployment_manager.as_ref())
            .context("Failed to order deployments in dependency order")?;

        // dependents go first when deleting
        if action == Action::Delete {
            stages.reverse();
        }

        tracing::debug!(
            "Ordered dependencies: {:?}",
            stages
                .iter()
                .map(|s| s.iter().map(Config::full_name).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        );

        if options.show_stages {
            return Self::show_stages(ctx, &stages, options.format.as_deref());
        }

        let mut runner = DeploymentRunner::new(ctx, options.preview);
        match runner.run(action, &stages)? {
            RunOutcome::Completed => {
                ctx.output.blank();
                ctx.output
                    .success(&format!("Finished {} of {} deployment(s)", action, configs.len()));
            }
            RunOutcome::Aborted => {
                ctx.output.dimmed("Remaining deployments were left untouched.");
            }
        }

        Ok(())
    }

    /// `--project`, else the gcloud default project
    fn resolve_project(ctx: &Context, project: Option<&str>) -> Option<String> {
        if let Some(project) = project {
            return Some(project.to_string());
        }

        match ctx.deployment_manager.default_project() {
            Ok(project) => project,
            Err(e) => {
                tracing::warn!("Could not read the gcloud default project: {:#}", e);
                None
            }
        }
    }

    /// Print the stages without touching any deployment
    fn show_stages(ctx: &Context, stages: &[Vec<Config>], format: Option<&str>) -> Result<()> {
        let entries: Vec<Vec<StageEntry>> = stages
            .iter()
            .map(|stage| stage.iter().map(StageEntry::from).collect())
            .collect();

        match format.unwrap_or("text") {
            "text" => {
                for (index, stage) in entries.iter().enumerate() {
                    ctx.output.section(&format!("Stage {}", index));
                    for entry in stage {
                        ctx.output.list_item(&format!(
                            "project: {}, deployment: {}, source: {}",
                            entry.project, entry.deployment, entry.source
                        ));
                    }
                }
            }
            "yaml" => {
                let yaml = serde_yaml::to_string(&entries).context("Failed to serialize stages")?;
                ctx.output.plain(yaml.trim_end());
            }
            "json" => {
                let json =
                    serde_json::to_string_pretty(&entries).context("Failed to serialize stages")?;
                ctx.output.plain(&json);
            }
            other => anyhow::bail!("Unsupported format: {}. Use text, yaml or json", other),
        }

        Ok(())
    }
}
