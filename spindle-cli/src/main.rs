//! Spindle CLI
//!
//! Generates the delivery pipelines of the applications described in
//! `configuration.json` and saves them through the orchestration gateway.

mod commands;
mod config;
mod source;

use anyhow::Result;
use clap::{ArgAction, Parser};
use commands::{Commands, handle_command};
use config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spindle")]
#[command(about = "Spindle delivery pipeline generator", long_about = None)]
struct Cli {
    /// Orchestration gateway URL
    #[arg(long, env = "SPINDLE_GATE_URL", default_value = "http://localhost:8084")]
    gate_url: String,

    /// Container registry API URL
    #[arg(long, env = "SPINDLE_REGISTRY_URL", default_value = "https://hub.docker.com")]
    registry_url: String,

    /// Registry and source-control organization
    #[arg(long, env = "SPINDLE_ORGANIZATION", default_value = "ealebed")]
    organization: String,

    /// Repository holding the generated manifests
    #[arg(long, env = "SPINDLE_MANIFEST_REPOSITORY", default_value = "test-k8s")]
    manifest_repository: String,

    /// Path to the application configuration file
    #[arg(long = "config", env = "SPINDLE_CONFIG", default_value = "configuration.json")]
    config_path: PathBuf,

    /// Write pipelines to files instead of saving them (`--dry-run false` to save)
    #[arg(long, env = "SPINDLE_DRY_RUN", default_value_t = true, action = ArgAction::Set)]
    dry_run: bool,

    /// Directory dry-run output is written to
    #[arg(long, env = "SPINDLE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            gate_url: self.gate_url.clone(),
            registry_url: self.registry_url.clone(),
            organization: self.organization.clone(),
            manifest_repository: self.manifest_repository.clone(),
            config_path: self.config_path.clone(),
            dry_run: self.dry_run,
            output_dir: self.output_dir.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle=info,spindle_compiler=info,spindle_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    settings.validate()?;

    handle_command(cli.command, &settings).await
}
