//! Compiler settings
//!
//! Organization-wide values that every generated pipeline refers to: where
//! images and manifests live and which accounts read them.

/// Settings shared by every application compiled in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    /// Registry namespace and source-control owner (e.g., "ealebed")
    pub organization: String,
    /// Repository holding the generated manifests
    pub manifest_repository: String,
    /// Branch the manifests are read from
    pub manifest_branch: String,
    /// Top-level directory of the manifests inside the repository
    pub manifest_root: String,
    /// Container registry host
    pub registry_host: String,
    /// Artifact account used to fetch images
    pub docker_account: String,
    /// Artifact account used to fetch manifest files
    pub manifest_account: String,
    /// Base of the source-control contents API
    pub content_api_url: String,
}

impl CompilerSettings {
    /// Creates settings with the default branch, layout and accounts
    pub fn new(organization: impl Into<String>, manifest_repository: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            manifest_repository: manifest_repository.into(),
            manifest_branch: "master".to_string(),
            manifest_root: "datacenters".to_string(),
            registry_host: "index.docker.io".to_string(),
            docker_account: "docker-registry".to_string(),
            manifest_account: "spinnaker-github-token".to_string(),
            content_api_url: "https://api.github.com/repos".to_string(),
        }
    }

    /// Expected artifact id of an image, `<org>/<image>`
    pub fn image_id(&self, image: &str) -> String {
        format!("{}/{}", self.organization, image)
    }

    /// Fully qualified image name, `<registry>/<org>/<image>`
    pub fn image_name(&self, image: &str) -> String {
        format!("{}/{}/{}", self.registry_host, self.organization, image)
    }

    /// URL the orchestration service fetches a manifest file from
    pub fn manifest_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/contents/{}",
            self.content_api_url.trim_end_matches('/'),
            self.organization,
            self.manifest_repository,
            path
        )
    }

    /// Service account that executions triggered for `owners` run as
    pub fn service_account(&self, owners: &str) -> String {
        format!("{}-service-account@{}.com", owners, self.organization)
    }
}
