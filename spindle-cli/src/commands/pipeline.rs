//! Pipeline command handlers
//!
//! `save` and `save-all` compile the pipelines of the selected applications.
//! In dry-run mode each pipeline is written to
//! `<output-dir>/<application>/<pipeline>.json`; otherwise the pipelines are
//! reconciled against the gateway.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use spindle_client::{GateClient, RegistryClient};
use spindle_compiler::{CompilerSettings, Outcome, Reconciler, compile_application};
use spindle_core::domain::config::Configuration;
use spindle_core::domain::pipeline::Pipeline;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Settings;
use crate::source;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Generate the pipelines of one application
    Save {
        /// Application name as written in the configuration file
        #[arg(short, long)]
        name: String,
    },
    /// Generate the pipelines of every configured application
    SaveAll,
}

/// Clients and settings shared by every application of one run
struct Run<'a> {
    settings: &'a Settings,
    compiler: CompilerSettings,
    registry: RegistryClient,
    reconciler: Reconciler<GateClient>,
}

impl<'a> Run<'a> {
    fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            compiler: settings.compiler_settings(),
            registry: RegistryClient::new(&settings.registry_url),
            reconciler: Reconciler::new(GateClient::new(&settings.gate_url)),
        }
    }
}

/// Handle pipeline commands
///
/// Applications are processed one after another; the first failure stops
/// the run.
pub async fn handle_pipeline_command(command: PipelineCommands, settings: &Settings) -> Result<()> {
    let configs = source::load(&settings.config_path)?;
    let selected: Vec<&Configuration> = match &command {
        PipelineCommands::Save { name } => vec![source::find(&configs, name)?],
        PipelineCommands::SaveAll => configs.iter().collect(),
    };

    let run = Run::new(settings);
    for config in selected {
        save_application(&run, config).await?;
    }

    Ok(())
}

async fn save_application(run: &Run<'_>, config: &Configuration) -> Result<()> {
    let application = &config.application;

    if config.skip_autogeneration {
        info!(application = %application, "Autogeneration disabled, skipping");
        println!("{} {}", "↷ Skipped".yellow(), application.bold());
        return Ok(());
    }

    if run.settings.dry_run {
        let pipelines = compile_application(config, &run.compiler, &run.registry)
            .await
            .with_context(|| format!("Failed to compile pipelines of '{}'", application))?;

        let paths = write_pipelines(&run.settings.output_dir.join(application), &pipelines)?;

        println!("{} {}", "✓ Pipelines generated:".green().bold(), application.bold());
        for path in paths {
            println!("  {}", path.display().to_string().dimmed());
        }
    } else {
        let saved = run
            .reconciler
            .sync_application(config, &run.compiler, &run.registry)
            .await
            .with_context(|| format!("Failed to save pipelines of '{}'", application))?;

        println!("{} {}", "✓ Pipelines saved:".green().bold(), application.bold());
        for result in saved {
            let outcome = match result.outcome {
                Outcome::Created => "created".green(),
                Outcome::Updated => "updated".cyan(),
            };
            println!("  {} {}", outcome, result.pipeline.name);
        }
    }

    Ok(())
}

/// Writes each pipeline as pretty-printed `<name>.json` into `dir`
fn write_pipelines(dir: &Path, pipelines: &[Pipeline]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut paths = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        let path = dir.join(format!("{}.json", pipeline.name));
        let json = serde_json::to_string_pretty(pipeline)
            .with_context(|| format!("Failed to serialize pipeline '{}'", pipeline.name))?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        paths.push(path);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(output_dir: &Path, config_path: PathBuf) -> Settings {
        Settings {
            gate_url: "http://127.0.0.1:9".to_string(),
            registry_url: "http://127.0.0.1:9".to_string(),
            organization: "acme".to_string(),
            manifest_repository: "k8s".to_string(),
            config_path,
            dry_run: true,
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn pinned(application: &str) -> Configuration {
        let mut config = Configuration::new(application, application).with_profile("production", &["gke1"]);
        config.version = Some("22.01.05-10.30".to_string());
        config
    }

    #[test]
    fn test_write_pipelines() {
        let dir = TempDir::new().unwrap();
        let pipelines = vec![Pipeline {
            application: "orders".to_string(),
            name: "deploy-gke1-dc(production)".to_string(),
            ..Default::default()
        }];

        let paths = write_pipelines(&dir.path().join("orders"), &pipelines).unwrap();

        assert_eq!(paths.len(), 1);
        let written: Pipeline =
            serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert_eq!(written, pipelines[0]);
        assert!(paths[0].ends_with("orders/deploy-gke1-dc(production).json"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_every_pipeline() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), PathBuf::from("configuration.json"));
        let run = Run::new(&settings);

        save_application(&run, &pinned("orders")).await.unwrap();

        let app_dir = dir.path().join("orders");
        assert!(app_dir.join("build-image.json").exists());
        assert!(app_dir.join("deploy-gke1-dc(production).json").exists());
    }

    #[tokio::test]
    async fn test_skipped_application_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), PathBuf::from("configuration.json"));
        let run = Run::new(&settings);

        let mut config = pinned("orders");
        config.skip_autogeneration = true;
        save_application(&run, &config).await.unwrap();

        assert!(!dir.path().join("orders").exists());
    }

    #[tokio::test]
    async fn test_save_all_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("configuration.json");
        let configs = vec![pinned("orders"), pinned("billing")];
        std::fs::write(&config_path, serde_json::to_string(&configs).unwrap()).unwrap();
        let settings = settings(&dir.path().join("out"), config_path);

        handle_pipeline_command(PipelineCommands::SaveAll, &settings)
            .await
            .unwrap();

        assert!(dir.path().join("out/orders/build-image.json").exists());
        assert!(dir.path().join("out/billing/build-image.json").exists());
    }

    #[tokio::test]
    async fn test_save_unknown_application() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("configuration.json");
        std::fs::write(&config_path, serde_json::to_string(&vec![pinned("orders")]).unwrap()).unwrap();
        let settings = settings(dir.path(), config_path);

        let command = PipelineCommands::Save {
            name: "missing".to_string(),
        };
        assert!(handle_pipeline_command(command, &settings).await.is_err());
    }
}
