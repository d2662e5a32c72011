//! Configuration file loading

use anyhow::{Context, Result, anyhow, bail};
use spindle_core::domain::config::Configuration;
use std::collections::HashSet;
use std::path::Path;

/// Reads and validates every application of a configuration file
pub fn load(path: &Path) -> Result<Vec<Configuration>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    let configs: Vec<Configuration> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

    let mut seen = HashSet::new();
    for config in &configs {
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        if !seen.insert(config.application.as_str()) {
            bail!("Application '{}' is configured more than once", config.application);
        }
    }

    Ok(configs)
}

/// The configuration of one application
pub fn find<'a>(configs: &'a [Configuration], application: &str) -> Result<&'a Configuration> {
    configs
        .iter()
        .find(|c| c.application == application)
        .ok_or_else(|| anyhow!("Application '{}' not found in configuration", application))
}
