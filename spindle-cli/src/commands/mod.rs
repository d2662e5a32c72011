//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;

pub use pipeline::PipelineCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Settings;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline generation
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
}

/// Routes the command to its handler module
pub async fn handle_command(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, settings).await,
    }
}
