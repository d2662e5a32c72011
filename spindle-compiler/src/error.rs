//! Compiler and reconciler errors

use spindle_client::ClientError;
use spindle_core::ConfigError;
use thiserror::Error;

/// Failures while turning a configuration into pipelines
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to list tags of {image} for '{application}': {source}")]
    TagLookup {
        application: String,
        image: String,
        #[source]
        source: ClientError,
    },

    #[error("registry has no tags for {image} needed by '{application}'")]
    NoTags { application: String, image: String },

    #[error("no version resolved for image {image}")]
    MissingVersion { image: String },

    #[error("pipeline '{pipeline}' of '{application}' has no upstream deploy pipeline to promote from")]
    UnresolvedUpstream {
        application: String,
        pipeline: String,
    },

    #[error("no identifier known for '{key}' in '{application}'")]
    MissingIdentity { application: String, key: String },
}

/// Failures while writing compiled pipelines to the remote store
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to look up pipeline '{pipeline}' of '{application}': {source}")]
    Lookup {
        application: String,
        pipeline: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to save pipeline '{pipeline}' of '{application}': {source}")]
    Save {
        application: String,
        pipeline: String,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    /// Remote status code behind the failure, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Lookup { source, .. } | Self::Save { source, .. } => source.status(),
            Self::Compile(CompileError::TagLookup { source, .. }) => source.status(),
            Self::Compile(_) => None,
        }
    }
}
