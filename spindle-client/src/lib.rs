//! Spindle HTTP Clients
//!
//! Type-safe HTTP clients for the two services the pipeline generator talks to:
//! - [`GateClient`]: the API gateway of the remote orchestration service,
//!   used to read and save pipeline definitions
//! - [`RegistryClient`]: the container registry, used to discover image tags
//!
//! # Example
//!
//! ```no_run
//! use spindle_client::GateClient;
//!
//! # async fn example() -> spindle_client::Result<()> {
//! let gate = GateClient::new("http://localhost:8084");
//!
//! if let Some(pipeline) = gate.get_pipeline("orders", "build-image").await? {
//!     println!("Found pipeline {:?}", pipeline.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
mod pipelines;
mod registry;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use registry::RegistryClient;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the orchestration service gateway
#[derive(Debug, Clone)]
pub struct GateClient {
    /// Base URL of the gateway (e.g., "http://localhost:8084")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl GateClient {
    /// Create a new gate client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway API (e.g., "http://localhost:8084")
    ///
    /// # Example
    /// ```
    /// use spindle_client::GateClient;
    ///
    /// let client = GateClient::new("http://localhost:8084");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new gate client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings and
    /// authentication headers.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the gateway API
    /// * `client` - A configured reqwest Client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the gateway
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code and deserialize the JSON body
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let response = check_status(response).await?;

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Check the status code of a response whose body is not needed
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    check_status(response).await.map(|_| ())
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response)
}
