//! Input validation errors

use thiserror::Error;

/// Problems found while validating an application configuration
///
/// A configuration that fails validation is rejected as a whole; nothing is
/// compiled for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("application name cannot be empty")]
    MissingApplication,

    #[error("application '{application}' has no image")]
    MissingImage { application: String },

    #[error("application '{application}' has a profile without a name")]
    UnnamedProfile { application: String },

    #[error("application '{application}' declares profile '{profile}' more than once")]
    DuplicateProfile {
        application: String,
        profile: String,
    },

    #[error("profile '{profile}' of '{application}' has a datacenter without a tier name")]
    UnnamedTier {
        application: String,
        profile: String,
    },

    #[error("profile '{profile}' of '{application}' declares tier '{tier}' more than once")]
    DuplicateTier {
        application: String,
        profile: String,
        tier: String,
    },
}
