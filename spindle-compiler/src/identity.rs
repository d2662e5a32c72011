//! Pipeline identity pre-assignment
//!
//! Every promotion and deploy pipeline of an application gets its identifier
//! in one pass before any pipeline body is built, so pipelines can point at
//! each other regardless of build order.

use spindle_core::domain::config::Configuration;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Profile that never gets a promotion gate
pub const UNGATED_PROFILE: &str = "beta";

/// Composite key naming one pre-assigned pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineKey {
    /// Promotion gate in front of a profile, `promote-to-<profile>`
    Promotion { profile: String },
    /// Deploy pipeline of one datacenter, `<profile>-<tier>`
    Deploy { profile: String, tier: String },
}

impl PipelineKey {
    pub fn promotion(profile: impl Into<String>) -> Self {
        Self::Promotion {
            profile: profile.into(),
        }
    }

    pub fn deploy(profile: impl Into<String>, tier: impl Into<String>) -> Self {
        Self::Deploy {
            profile: profile.into(),
            tier: tier.into(),
        }
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Promotion { profile } => write!(f, "promote-to-{}", profile),
            Self::Deploy { profile, tier } => write!(f, "{}-{}", profile, tier),
        }
    }
}

/// Immutable table of pre-assigned pipeline identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    ids: BTreeMap<PipelineKey, String>,
}

impl IdentityMap {
    /// Assigns a fresh random UUID to every pipeline key of the configuration
    pub fn assign(config: &Configuration) -> Self {
        Self::assign_with(config, |_| Uuid::new_v4().to_string())
    }

    /// Assigns identifiers produced by `next_id`, called once per key
    pub fn assign_with<F>(config: &Configuration, mut next_id: F) -> Self
    where
        F: FnMut(&PipelineKey) -> String,
    {
        let mut ids = BTreeMap::new();

        for profile in &config.profiles {
            if profile.profile_name != UNGATED_PROFILE {
                let key = PipelineKey::promotion(&profile.profile_name);
                let id = next_id(&key);
                ids.insert(key, id);
            }

            for datacenter in &profile.datacenters {
                let key = PipelineKey::deploy(&profile.profile_name, &datacenter.tier_name);
                let id = next_id(&key);
                ids.insert(key, id);
            }
        }

        Self { ids }
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PipelineKey, &str)> {
        self.ids.iter().map(|(k, v)| (k, v.as_str()))
    }
}

/// Pre-assigned identifiers overlaid with the ones the remote store reported
///
/// While an application is reconciled, each saved pipeline records the id
/// the store actually holds for it. Cross references resolve to that id
/// first and fall back to the pre-assigned one.
#[derive(Debug, Clone)]
pub struct ResolvedIds<'a> {
    assigned: &'a IdentityMap,
    observed: BTreeMap<PipelineKey, String>,
}

impl<'a> ResolvedIds<'a> {
    pub fn new(assigned: &'a IdentityMap) -> Self {
        Self {
            assigned,
            observed: BTreeMap::new(),
        }
    }

    /// Records the id the remote store holds for `key`
    pub fn record(&mut self, key: PipelineKey, id: impl Into<String>) {
        self.observed.insert(key, id.into());
    }

    /// Identifier assigned before compilation started
    pub fn preassigned(&self, key: &PipelineKey) -> Option<&str> {
        self.assigned.get(key)
    }

    /// Best known identifier for a pipeline another one refers to
    pub fn resolve(&self, key: &PipelineKey) -> Option<&str> {
        self.observed
            .get(key)
            .map(String::as_str)
            .or_else(|| self.assigned.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Configuration {
        Configuration::new("orders", "orders")
            .with_profile("beta", &["gke1"])
            .with_profile("nightly", &["gke1", "gke2"])
            .with_profile("production", &["gke1"])
    }

    #[test]
    fn test_key_display() {
        assert_eq!(PipelineKey::promotion("production").to_string(), "promote-to-production");
        assert_eq!(PipelineKey::deploy("nightly", "gke2").to_string(), "nightly-gke2");
    }

    #[test]
    fn test_assigns_every_key() {
        let ids = IdentityMap::assign_with(&ladder(), |key| key.to_string());

        let keys: Vec<String> = ids.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(ids.len(), 6);
        assert!(keys.contains(&"promote-to-nightly".to_string()));
        assert!(keys.contains(&"promote-to-production".to_string()));
        assert!(!keys.contains(&"promote-to-beta".to_string()));
        assert_eq!(ids.get(&PipelineKey::deploy("nightly", "gke2")), Some("nightly-gke2"));
    }

    #[test]
    fn test_random_ids_are_unique() {
        let ids = IdentityMap::assign(&ladder());
        let mut values: Vec<&str> = ids.iter().map(|(_, v)| v).collect();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), ids.len());
        assert!(values.iter().all(|v| Uuid::parse_str(v).is_ok()));
    }

    #[test]
    fn test_empty_profile_gets_only_gate_key() {
        let config = Configuration::new("orders", "orders").with_profile("production", &[]);
        let ids = IdentityMap::assign_with(&config, |key| key.to_string());
        assert_eq!(ids.len(), 1);
        assert!(ids.get(&PipelineKey::promotion("production")).is_some());
    }

    #[test]
    fn test_observed_id_wins() {
        let ids = IdentityMap::assign_with(&ladder(), |key| key.to_string());
        let mut resolved = ResolvedIds::new(&ids);
        let key = PipelineKey::promotion("production");

        assert_eq!(resolved.resolve(&key), Some("promote-to-production"));

        resolved.record(key.clone(), "remote-id");
        assert_eq!(resolved.resolve(&key), Some("remote-id"));
        assert_eq!(resolved.preassigned(&key), Some("promote-to-production"));
        assert_eq!(resolved.resolve(&PipelineKey::deploy("prod", "x")), None);
    }
}
