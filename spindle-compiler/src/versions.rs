//! Image tag resolution
//!
//! Tags are resolved once per application, before any pipeline is built. A
//! pinned version wins; otherwise the most recent registry tag is used.

use spindle_core::domain::config::{Configuration, GEOIP_DEPENDENCY};
use tracing::debug;

use crate::artifacts::GEOIP_IMAGE;
use crate::error::CompileError;
use crate::store::TagLookup;

/// Tags every deploy pipeline of one application defaults to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactVersions {
    /// Tag of the application image
    pub image: String,
    /// Tag of the geo-IP image, when the dependency is declared
    pub geoip: Option<String>,
}

impl ArtifactVersions {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            geoip: None,
        }
    }

    pub fn with_geoip(mut self, tag: impl Into<String>) -> Self {
        self.geoip = Some(tag.into());
        self
    }
}

/// Resolves the image tags `config` needs
///
/// # Errors
/// Registry failures and images without any tag are returned as-is; no
/// default tag is ever guessed.
pub async fn resolve_versions(
    config: &Configuration,
    organization: &str,
    registry: &dyn TagLookup,
) -> Result<ArtifactVersions, CompileError> {
    let image = match config.pinned_version() {
        Some(version) => version.to_string(),
        None => latest_tag(registry, &config.application, organization, &config.docker_image).await?,
    };

    let geoip = if config.depends_on(GEOIP_DEPENDENCY) {
        Some(latest_tag(registry, &config.application, organization, GEOIP_IMAGE).await?)
    } else {
        None
    };

    Ok(ArtifactVersions { image, geoip })
}

async fn latest_tag(
    registry: &dyn TagLookup,
    application: &str,
    organization: &str,
    image: &str,
) -> Result<String, CompileError> {
    let tags = registry
        .list_tags(organization, image)
        .await
        .map_err(|source| CompileError::TagLookup {
            application: application.to_string(),
            image: format!("{}/{}", organization, image),
            source,
        })?;

    let latest = tags.into_iter().next().ok_or_else(|| CompileError::NoTags {
        application: application.to_string(),
        image: format!("{}/{}", organization, image),
    })?;

    debug!("Latest tag of {}/{} is {}", organization, image, latest.name);
    Ok(latest.name)
}
