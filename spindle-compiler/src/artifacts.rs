//! Expected artifacts and manifest paths
//!
//! Manifest paths are shared with whatever publishes the manifests to the
//! repository, so they must stay stable.

use spindle_core::domain::pipeline::{Artifact, ArtifactType, ExpectedArtifact};

use crate::policy::StageRole;
use crate::settings::CompilerSettings;

/// Image carrying the geo-IP database
pub const GEOIP_IMAGE: &str = "maxmind-geoip";

/// Directory of manifests shared by every cluster
const COMMONS_DIR: &str = "_commons";

/// Manifest creating the application's namespace on a cluster
pub fn namespace_manifest_path(settings: &CompilerSettings, tier: &str, namespace: &str) -> String {
    format!("{}/{}/{}/_namespace.yaml", settings.manifest_root, tier, namespace)
}

/// Manifest of an environment or config bundle shared across clusters
pub fn bundle_manifest_path(settings: &CompilerSettings, bundle: &str) -> String {
    format!("{}/{}/{}.yaml", settings.manifest_root, COMMONS_DIR, bundle)
}

/// Manifest of the application itself on one cluster
///
/// Production manifests carry no profile suffix.
pub fn application_manifest_path(
    settings: &CompilerSettings,
    tier: &str,
    namespace: &str,
    application: &str,
    profile: &str,
) -> String {
    if StageRole::of(profile) == StageRole::Production {
        format!("{}/{}/{}/{}.yaml", settings.manifest_root, tier, namespace, application)
    } else {
        format!(
            "{}/{}/{}/{}-{}.yaml",
            settings.manifest_root, tier, namespace, application, profile
        )
    }
}

/// Expected container image, defaulting to `tag`
pub fn docker_image(settings: &CompilerSettings, image: &str, tag: &str) -> ExpectedArtifact {
    let id = settings.image_id(image);
    let name = settings.image_name(image);

    ExpectedArtifact {
        id,
        display_name: name.clone(),
        default_artifact: Artifact {
            artifact_type: ArtifactType::DockerImage,
            artifact_account: Some(settings.docker_account.clone()),
            custom_kind: false,
            name: Some(name.clone()),
            reference: Some(format!("{}:{}", name, tag)),
            version: Some(tag.to_string()),
        },
        match_artifact: Artifact {
            artifact_type: ArtifactType::DockerImage,
            artifact_account: Some(settings.docker_account.clone()),
            custom_kind: false,
            name: Some(name),
            reference: None,
            version: None,
        },
        use_default_artifact: true,
        use_prior_artifact: true,
    }
}

/// Expected manifest file, read from the manifest branch
pub fn manifest_file(settings: &CompilerSettings, path: &str) -> ExpectedArtifact {
    ExpectedArtifact {
        id: path.to_string(),
        display_name: path.to_string(),
        default_artifact: Artifact {
            artifact_type: ArtifactType::GithubFile,
            artifact_account: Some(settings.manifest_account.clone()),
            custom_kind: false,
            name: Some(path.to_string()),
            reference: Some(settings.manifest_url(path)),
            version: Some(settings.manifest_branch.clone()),
        },
        match_artifact: Artifact {
            artifact_type: ArtifactType::GithubFile,
            artifact_account: Some(settings.manifest_account.clone()),
            custom_kind: true,
            name: Some(path.to_string()),
            reference: None,
            version: None,
        },
        use_default_artifact: true,
        use_prior_artifact: false,
    }
}
