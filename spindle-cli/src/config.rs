//! CLI settings
//!
//! Everything the commands need to reach the gateway and the registry and to
//! find the configuration file.

use anyhow::{Result, bail};
use spindle_compiler::CompilerSettings;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Orchestration gateway base URL
    pub gate_url: String,
    /// Container registry API base URL
    pub registry_url: String,
    pub organization: String,
    pub manifest_repository: String,
    /// Path to `configuration.json`
    pub config_path: PathBuf,
    /// When set, pipelines are written to `output_dir` and nothing is saved
    pub dry_run: bool,
    pub output_dir: PathBuf,
}

impl Settings {
    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("gate_url", &self.gate_url), ("registry_url", &self.registry_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("{} must start with http:// or https://", name);
            }
        }

        if self.organization.trim().is_empty() {
            bail!("organization cannot be empty");
        }

        if self.manifest_repository.trim().is_empty() {
            bail!("manifest_repository cannot be empty");
        }

        Ok(())
    }

    pub fn compiler_settings(&self) -> CompilerSettings {
        CompilerSettings::new(&self.organization, &self.manifest_repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            gate_url: "http://localhost:8084".to_string(),
            registry_url: "https://hub.docker.com".to_string(),
            organization: "acme".to_string(),
            manifest_repository: "k8s".to_string(),
            config_path: PathBuf::from("configuration.json"),
            dry_run: true,
            output_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_validation() {
        let mut settings = settings();
        assert!(settings.validate().is_ok());

        settings.gate_url = "localhost:8084".to_string();
        assert!(settings.validate().is_err());

        settings.gate_url = "http://localhost:8084".to_string();
        settings.organization = " ".to_string();
        assert!(settings.validate().is_err());

        settings.organization = "acme".to_string();
        settings.manifest_repository = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_compiler_settings() {
        let compiler = settings().compiler_settings();
        assert_eq!(compiler.organization, "acme");
        assert_eq!(compiler.manifest_repository, "k8s");
        assert_eq!(compiler.manifest_root, "datacenters");
    }
}
