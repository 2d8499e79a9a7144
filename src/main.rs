mod commands;
mod context;
mod deployment;
mod error;
mod output;
mod test_helpers;
mod traits;

use clap::{Args, Parser, Subcommand};
use commands::{DeployCommand, DeployOptions};
use context::Context;
use deployment::Action;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cft")]
#[command(about = "Cloud Foundation Toolkit - deploy Deployment Manager configs in dependency order", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug logs (gcloud calls, dependency edges)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create deployments, dependencies first
    Create(DeployArgs),

    /// Update existing deployments, dependencies first
    Update(DeployArgs),

    /// Create missing deployments and update existing ones
    Apply(DeployArgs),

    /// Delete deployments, dependents first
    Delete(DeployArgs),
}

#[derive(Args)]
struct DeployArgs {
    /// Project for configs that do not set one (defaults to the gcloud project)
    #[arg(short, long, env = "CLOUD_FOUNDATION_PROJECT_ID")]
    project: Option<String>,

    /// Preview every change and ask before applying it
    #[arg(long)]
    preview: bool,

    /// Print the deployment stages and exit
    #[arg(long)]
    show_stages: bool,

    /// Format of --show-stages output: text, yaml or json
    #[arg(long)]
    format: Option<String>,

    /// Config files, directories, glob patterns or inline YAML
    #[arg(required = true)]
    configs: Vec<String>,
}

impl From<DeployArgs> for DeployOptions {
    fn from(args: DeployArgs) -> Self {
        Self {
            project: args.project,
            preview: args.preview,
            show_stages: args.show_stages,
            format: args.format,
            configs: args.configs,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::new();

    let (action, args) = match cli.command {
        Commands::Create(args) => (Action::Create, args),
        Commands::Update(args) => (Action::Update, args),
        Commands::Apply(args) => (Action::Apply, args),
        Commands::Delete(args) => (Action::Delete, args),
    };

    if let Err(e) = DeployCommand::execute(&ctx, action, &args.into()) {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
