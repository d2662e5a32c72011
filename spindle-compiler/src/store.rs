//! Ports to the remote collaborators
//!
//! The compiler and reconciler only talk to the outside world through these
//! traits. The HTTP clients implement them; tests substitute in-memory fakes.

use async_trait::async_trait;
use spindle_client::{GateClient, RegistryClient, Result};
use spindle_core::domain::pipeline::Pipeline;
use spindle_core::dto::registry::Tag;

/// Remote pipeline store
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Stored pipeline with this application and name, if any
    async fn get_pipeline(&self, application: &str, name: &str) -> Result<Option<Pipeline>>;

    /// Create or update, keyed by the pipeline's id when present
    async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()>;
}

/// Container registry tag discovery
#[async_trait]
pub trait TagLookup: Send + Sync {
    /// Tags of `organization/image`, most recent first
    async fn list_tags(&self, organization: &str, image: &str) -> Result<Vec<Tag>>;
}

#[async_trait]
impl PipelineStore for GateClient {
    async fn get_pipeline(&self, application: &str, name: &str) -> Result<Option<Pipeline>> {
        GateClient::get_pipeline(self, application, name).await
    }

    async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        GateClient::save_pipeline(self, pipeline).await
    }
}

#[async_trait]
impl TagLookup for RegistryClient {
    async fn list_tags(&self, organization: &str, image: &str) -> Result<Vec<Tag>> {
        RegistryClient::list_tags(self, organization, image).await
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use spindle_client::ClientError;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    /// Pipeline store held in memory, keyed by application and name
    ///
    /// Saving assigns an id and an index the way the remote store does.
    #[derive(Default)]
    pub struct MemoryStore {
        pub pipelines: Mutex<BTreeMap<(String, String), Pipeline>>,
        pub saved: Mutex<Vec<Pipeline>>,
        pub lookup_failures: Mutex<VecDeque<ClientError>>,
        pub save_failures: Mutex<BTreeMap<String, u16>>,
    }

    impl MemoryStore {
        pub fn insert(&self, pipeline: Pipeline) {
            let key = (pipeline.application.clone(), pipeline.name.clone());
            self.pipelines.lock().unwrap().insert(key, pipeline);
        }

        pub fn stored(&self, application: &str, name: &str) -> Option<Pipeline> {
            let key = (application.to_string(), name.to_string());
            self.pipelines.lock().unwrap().get(&key).cloned()
        }

        pub fn fail_next_lookup(&self, error: ClientError) {
            self.lookup_failures.lock().unwrap().push_back(error);
        }

        pub fn reject_save(&self, name: &str, status: u16) {
            self.save_failures.lock().unwrap().insert(name.to_string(), status);
        }

        pub fn saved_names(&self) -> Vec<String> {
            self.saved.lock().unwrap().iter().map(|p| p.name.clone()).collect()
        }
    }

    #[async_trait]
    impl PipelineStore for MemoryStore {
        async fn get_pipeline(&self, application: &str, name: &str) -> Result<Option<Pipeline>> {
            if let Some(error) = self.lookup_failures.lock().unwrap().pop_front() {
                return Err(error);
            }
            Ok(self.stored(application, name))
        }

        async fn save_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
            if let Some(status) = self.save_failures.lock().unwrap().get(&pipeline.name) {
                return Err(ClientError::api_error(*status, "rejected"));
            }

            let mut pipelines = self.pipelines.lock().unwrap();
            let mut stored = pipeline.clone();
            if stored.id.is_none() {
                stored.id = Some(format!("remote-{}", pipelines.len()));
            }
            if !pipelines.contains_key(&(stored.application.clone(), stored.name.clone())) {
                stored.index = pipelines.len() as i32;
            }
            stored.update_ts = Some("1650000000000".to_string());

            self.saved.lock().unwrap().push(stored.clone());
            pipelines.insert((stored.application.clone(), stored.name.clone()), stored);
            Ok(())
        }
    }

    /// Registry answering from a fixed tag list per image
    #[derive(Default)]
    pub struct StaticRegistry {
        pub tags: BTreeMap<String, Vec<String>>,
    }

    impl StaticRegistry {
        pub fn with(mut self, image: &str, tags: &[&str]) -> Self {
            self.tags
                .insert(image.to_string(), tags.iter().map(|t| t.to_string()).collect());
            self
        }
    }

    #[async_trait]
    impl TagLookup for StaticRegistry {
        async fn list_tags(&self, organization: &str, image: &str) -> Result<Vec<Tag>> {
            let tags = self
                .tags
                .get(image)
                .ok_or_else(|| ClientError::NotFound(format!("image {}/{}", organization, image)))?;

            Ok(tags
                .iter()
                .map(|name| Tag {
                    name: name.clone(),
                    last_updated: None,
                    full_size: None,
                })
                .collect())
        }
    }
}
