use super::config::Config;
use super::manager::DeploymentStatus;
use super::outputs::Outputs;
use crate::context::Context;
use crate::error::DeploymentError;
use anyhow::{Context as _, Result};
use std::fmt;

const PREVIEW_UPDATE: &str = "Update";
const PREVIEW_SKIP: &str = "Skip";
const PREVIEW_ABORT: &str = "Abort";

/// What to do with every deployment of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    /// Create missing deployments, update existing ones
    Apply,
    Delete,
}

impl Action {
    fn progress(&self) -> &'static str {
        match self {
            Action::Create => "Creating",
            Action::Update => "Updating",
            Action::Apply => "Applying",
            Action::Delete => "Deleting",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Apply => "apply",
            Action::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The user chose Abort at a preview prompt
    Aborted,
}

/// How one deployment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Done,
    Skipped,
    Aborted,
}

/// Executes ordered stages against Deployment Manager, one deployment at a time
pub struct DeploymentRunner<'a> {
    ctx: &'a Context,
    outputs: Outputs,
    preview: bool,
}

impl<'a> DeploymentRunner<'a> {
    pub fn new(ctx: &'a Context, preview: bool) -> Self {
        Self {
            ctx,
            outputs: Outputs::new(),
            preview,
        }
    }

    /// Outputs collected so far
    #[allow(dead_code)]
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Run `action` over `stages` in order.
    ///
    /// Stages for [`Action::Delete`] are expected to be reversed already.
    pub fn run(&mut self, action: Action, stages: &[Vec<Config>]) -> Result<RunOutcome> {
        let total: usize = stages.iter().map(Vec::len).sum();
        let mut number = 0;

        for (index, stage) in stages.iter().enumerate() {
            tracing::info!("Stage {} of {}: {} deployment(s)", index + 1, stages.len(), stage.len());

            for config in stage {
                number += 1;
                self.ctx
                    .output
                    .step(number, total, &format!("{} {}", action.progress(), config));

                let outcome = match action {
                    Action::Create => self.deploy(config, Action::Create)?,
                    Action::Update => self.deploy(config, Action::Update)?,
                    Action::Apply => self.apply(config)?,
                    Action::Delete => self.delete(config)?,
                };

                if outcome == StepOutcome::Aborted {
                    self.ctx.output.warning("Aborting deployment run!");
                    return Ok(RunOutcome::Aborted);
                }
            }
        }

        Ok(RunOutcome::Completed)
    }

    /// Create if missing, update if done, refuse otherwise
    fn apply(&mut self, config: &Config) -> Result<StepOutcome> {
        let status = self
            .ctx
            .deployment_manager
            .get_status(&config.project, &config.name)
            .with_context(|| format!("Failed to get status of deployment {}", config))?;

        tracing::debug!("Deployment {} is {}", config, status);

        match status {
            DeploymentStatus::Done => self.deploy(config, Action::Update),
            DeploymentStatus::NotFound => self.deploy(config, Action::Create),
            DeploymentStatus::Pending | DeploymentStatus::Running | DeploymentStatus::Error => {
                Err(DeploymentError::DeploymentNotReady {
                    deployment: config.full_name(),
                    status: status.to_string(),
                }
                .into())
            }
        }
    }

    /// Render, submit and, unless skipped, record outputs
    fn deploy(&mut self, config: &Config, action: Action) -> Result<StepOutcome> {
        let manager = self.ctx.deployment_manager.as_ref();

        let rendered = config.render(&mut self.outputs, manager)?;
        let path = self
            .ctx
            .fs
            .write_temp(&format!("{}-", config.full_name()), ".yaml", &rendered)
            .with_context(|| format!("Failed to write rendered config of {}", config))?;
        tracing::debug!("Rendered config for {} written to {}", config, path.display());

        let result = match action {
            Action::Create => manager.create(&config.project, &config.name, &path, self.preview),
            _ => manager.update(&config.project, &config.name, &path, self.preview),
        };
        let message = result.with_context(|| format!("Failed to {} deployment {}", action, config))?;
        if !message.trim().is_empty() {
            self.ctx.output.dimmed(message.trim_end());
        }

        if self.preview {
            let outcome = self.resolve_preview(config, action)?;
            if outcome != StepOutcome::Done {
                return Ok(outcome);
            }
        }

        let fetched = manager
            .get_outputs(&config.project, &config.name)
            .with_context(|| format!("Failed to get outputs of deployment {}", config))?;
        self.outputs.insert(config.full_name(), fetched);

        self.ctx.output.success(&format!(
            "{} {}",
            if action == Action::Create { "Created" } else { "Updated" },
            config
        ));
        Ok(StepOutcome::Done)
    }

    /// Ask what to do with a previewed create or update
    fn resolve_preview(&self, config: &Config, action: Action) -> Result<StepOutcome> {
        let manager = self.ctx.deployment_manager.as_ref();
        let options = vec![
            PREVIEW_UPDATE.to_string(),
            PREVIEW_SKIP.to_string(),
            PREVIEW_ABORT.to_string(),
        ];

        let choice = self
            .ctx
            .input
            .select(&format!("Preview of {} ready. Update, skip or abort?", config), options)?;

        match choice.as_str() {
            PREVIEW_UPDATE => {
                manager
                    .apply_preview(&config.project, &config.name)
                    .with_context(|| format!("Failed to apply preview of deployment {}", config))?;
                Ok(StepOutcome::Done)
            }
            PREVIEW_SKIP => {
                manager
                    .cancel_preview(&config.project, &config.name)
                    .with_context(|| format!("Failed to cancel preview of deployment {}", config))?;
                self.ctx
                    .output
                    .warning(&format!("Canceled {} of deployment {}", action, config));

                // a canceled create preview leaves an empty deployment behind
                if action == Action::Create {
                    manager
                        .delete(&config.project, &config.name)
                        .with_context(|| format!("Failed to delete canceled deployment {}", config))?;
                }
                Ok(StepOutcome::Skipped)
            }
            _ => Ok(StepOutcome::Aborted),
        }
    }

    /// Delete, tolerating deployments that are already gone
    fn delete(&mut self, config: &Config) -> Result<StepOutcome> {
        let manager = self.ctx.deployment_manager.as_ref();

        if let Err(e) = manager.delete(&config.project, &config.name) {
            let status = manager.get_status(&config.project, &config.name);
            if matches!(status, Ok(DeploymentStatus::NotFound)) {
                self.ctx.output.warning(&format!(
                    "Deployment {} does not exist, skipping deletion",
                    config
                ));
                self.outputs.remove(&config.full_name());
                return Ok(StepOutcome::Skipped);
            }
            return Err(e.context(format!("Failed to delete deployment {}", config)));
        }

        self.outputs.remove(&config.full_name());
        self.ctx.output.success(&format!("Deleted {}", config));
        Ok(StepOutcome::Done)
    }
}
