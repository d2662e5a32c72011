//! Pipeline-related gate endpoints

use reqwest::Url;
use spindle_core::domain::pipeline::Pipeline;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{GateClient, handle_empty_response};

impl GateClient {
    // =============================================================================
    // Pipeline Configs
    // =============================================================================

    /// Look up a stored pipeline by application and name
    ///
    /// # Returns
    /// `None` when the gateway answers 404 or returns an empty document.
    ///
    /// # Errors
    /// Any other non-success status is returned as [`ClientError::ApiError`]
    /// so the caller can decide how much to trust a failed lookup.
    pub async fn get_pipeline(&self, application: &str, name: &str) -> Result<Option<Pipeline>> {
        if application.is_empty() || name.is_empty() {
            return Err(ClientError::InvalidRequest(
                "application and pipeline name are required".to_string(),
            ));
        }

        let url = self.endpoint(&["applications", application, "pipelineConfigs", name])?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: serde_json::Value = crate::handle_response(response).await?;
        let is_empty = match &body {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if is_empty {
            return Ok(None);
        }

        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| ClientError::ParseError(format!("Invalid pipeline definition: {}", e)))
    }

    /// Save a pipeline definition
    ///
    /// The gateway creates the pipeline when its id is unknown and updates
    /// it otherwise.
    pub async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        let url = self.endpoint(&["pipelines"])?;
        debug!("POST {} ({})", url, pipeline.name);

        let response = self.client.post(url).json(pipeline).send().await?;

        handle_empty_response(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidRequest(format!("Invalid gate URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidRequest(format!("Invalid gate URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}
