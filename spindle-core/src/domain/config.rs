//! Application configuration model
//!
//! One entry of `configuration.json`: an application, the deployment profiles
//! it goes through and the datacenters (tiers) inside each profile.
//! Produced by the configuration loader and read-only afterwards.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;

/// Namespace that is assumed to exist on every cluster
pub const DEFAULT_NAMESPACE: &str = "default";

/// Dependency name suffix marking a shared config bundle manifest
pub const CONFIG_BUNDLE_SUFFIX: &str = "-config";

/// Dependency that pulls the geo-IP data image into the deployment
pub const GEOIP_DEPENDENCY: &str = "maxmind";

/// Declarative description of one application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub application: String,
    #[serde(rename = "image", default)]
    pub docker_image: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub profiles: Vec<Profile>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Dependency>,
    #[serde(rename = "type", default)]
    pub app_type: String,
    #[serde(default)]
    pub owners: String,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_pool: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub slack_channel: String,
    #[serde(default)]
    pub jenkins_job_name: String,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeployStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos_monkey: Option<ChaosMonkey>,
    /// Pinned image tag; when absent the latest registry tag is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub skip_autogeneration: bool,
}

/// A named deployment stage (beta, nightly, production, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub datacenters: Vec<Datacenter>,
}

/// One cluster inside a profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    pub tier_name: String,
    #[serde(default)]
    pub replicas: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_pool: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub env: Vec<EnvVar>,
    /// Environment bundles applied to this datacenter only
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_deadline: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_probe: Option<Probe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos_monkey: Option<ChaosMonkey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Deployment rollout strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStrategy {
    /// "Recreate" or "RollingUpdate" (the default)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub strategy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdate>,
}

/// Rolling update limits, expressed as percentages of desired pods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub limits: Option<ResourceList>,
    pub requests: Option<ResourceList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceList {
    pub cpu: String,
    pub memory: String,
}

/// Health probe settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    #[serde(rename = "type")]
    pub probe_type: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub delay: i32,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub timeout_seconds: i32,
    #[serde(default)]
    pub period_seconds: i32,
    #[serde(default)]
    pub success_threshold: i32,
    #[serde(default)]
    pub failure_threshold: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosMonkey {
    pub enabled: bool,
    #[serde(default)]
    pub mtbf: String,
    #[serde(default)]
    pub kill_mode: String,
    #[serde(default)]
    pub kill_value: String,
}

/// A named dependency of the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Dependency {
    /// Whether this dependency names a shared config bundle manifest
    pub fn is_config_bundle(&self) -> bool {
        self.name.ends_with(CONFIG_BUNDLE_SUFFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub name: String,
    pub container_port: u16,
}

impl Configuration {
    /// Creates a configuration with the given application and image and
    /// everything else left empty
    pub fn new(application: impl Into<String>, docker_image: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            docker_image: docker_image.into(),
            profiles: Vec::new(),
            env_from: Vec::new(),
            depends_on: Vec::new(),
            app_type: String::new(),
            owners: String::new(),
            owner_email: String::new(),
            node_pool: None,
            namespace: default_namespace(),
            slack_channel: String::new(),
            jenkins_job_name: String::new(),
            ports: Vec::new(),
            strategy: None,
            chaos_monkey: None,
            version: None,
            skip_autogeneration: false,
        }
    }

    /// Adds a profile with the given tiers
    pub fn with_profile(mut self, name: impl Into<String>, tiers: &[&str]) -> Self {
        self.profiles.push(Profile {
            profile_name: name.into(),
            datacenters: tiers
                .iter()
                .map(|tier| Datacenter {
                    tier_name: (*tier).to_string(),
                    ..Default::default()
                })
                .collect(),
        });
        self
    }

    /// Names of all configured profiles, in configuration order
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles
            .iter()
            .map(|p| p.profile_name.as_str())
            .collect()
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.profile_name == name)
    }

    /// Whether a dependency with exactly this name is declared
    pub fn depends_on(&self, name: &str) -> bool {
        self.depends_on.iter().any(|d| d.name == name)
    }

    /// Names of the declared config bundle dependencies
    pub fn config_bundles(&self) -> impl Iterator<Item = &str> {
        self.depends_on
            .iter()
            .filter(|d| d.is_config_bundle())
            .map(|d| d.name.as_str())
    }

    /// Whether the application lives outside the default namespace
    pub fn has_custom_namespace(&self) -> bool {
        self.namespace != DEFAULT_NAMESPACE
    }

    /// The pinned image tag, ignoring an empty string
    pub fn pinned_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }

    /// Checks the invariants the pipeline compiler relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application.trim().is_empty() {
            return Err(ConfigError::MissingApplication);
        }

        let application = self.application.clone();

        if self.docker_image.trim().is_empty() {
            return Err(ConfigError::MissingImage { application });
        }

        let mut profiles = HashSet::new();
        for profile in &self.profiles {
            if profile.profile_name.trim().is_empty() {
                return Err(ConfigError::UnnamedProfile { application });
            }
            if !profiles.insert(profile.profile_name.as_str()) {
                return Err(ConfigError::DuplicateProfile {
                    application,
                    profile: profile.profile_name.clone(),
                });
            }

            let mut tiers = HashSet::new();
            for datacenter in &profile.datacenters {
                if datacenter.tier_name.trim().is_empty() {
                    return Err(ConfigError::UnnamedTier {
                        application,
                        profile: profile.profile_name.clone(),
                    });
                }
                if !tiers.insert(datacenter.tier_name.as_str()) {
                    return Err(ConfigError::DuplicateTier {
                        application,
                        profile: profile.profile_name.clone(),
                        tier: datacenter.tier_name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Profile {
    /// Tier name of the first datacenter, if the profile has any
    pub fn first_tier(&self) -> Option<&str> {
        self.datacenters.first().map(|dc| dc.tier_name.as_str())
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
