//! Container registry client
//!
//! Lists image tags through the Docker Hub compatible `v2/repositories`
//! API, most recently pushed first.

use reqwest::Client;
use spindle_core::dto::registry::{Tag, TagPage};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Number of tags requested per page
const PAGE_SIZE: u32 = 100;

/// HTTP client for the container registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    client: Client,
}

impl RegistryClient {
    /// Create a new registry client
    ///
    /// # Arguments
    /// * `base_url` - The registry API root (e.g., "https://hub.docker.com")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new registry client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the tags of an image, most recent first
    ///
    /// # Arguments
    /// * `organization` - Registry namespace owning the image
    /// * `image` - Image name inside the namespace
    pub async fn list_tags(&self, organization: &str, image: &str) -> Result<Vec<Tag>> {
        let url = format!(
            "{}/v2/repositories/{}/{}/tags",
            self.base_url, organization, image
        );
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("page_size", PAGE_SIZE.to_string()),
                ("ordering", "last_updated".to_string()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("image {}/{}", organization, image)));
        }

        let page: TagPage = crate::handle_response(response).await?;
        Ok(page.results)
    }
}
