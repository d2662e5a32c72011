//! Promotion policy
//!
//! The promotion ladder is beta → nightly → production. Each rung that is
//! present changes how the next one is reached: a present upstream rung
//! puts a manual promotion gate in front of the stage and turns its registry
//! trigger off. Profile names are mapped to [`StageRole`]s once, here; the
//! rest of the compiler only sees roles and decisions.

use spindle_core::domain::config::{Configuration, Profile};

use crate::identity::PipelineKey;

/// Recognized role of a profile on the promotion ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageRole {
    /// "beta", the first pre-production gate
    Beta,
    /// "nightly", the second pre-production gate
    Nightly,
    /// "production", the terminal stage
    Production,
    /// Names starting with "dev"
    Development,
    /// Any other name, standalone with no promotion semantics
    Other,
}

impl StageRole {
    pub fn of(profile: &str) -> Self {
        match profile {
            "beta" => Self::Beta,
            "nightly" => Self::Nightly,
            "production" => Self::Production,
            name if name.starts_with("dev") => Self::Development,
            _ => Self::Other,
        }
    }
}

/// A pre-production rung present on the application
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rung {
    profile: String,
    first_tier: String,
}

impl Rung {
    /// Deploy pipeline of the rung's first datacenter
    fn upstream(&self) -> PipelineKey {
        PipelineKey::deploy(&self.profile, &self.first_tier)
    }
}

/// The pre-production rungs configured for one application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ladder {
    beta: Option<Rung>,
    nightly: Option<Rung>,
}

impl Ladder {
    pub fn of(config: &Configuration) -> Self {
        Self::from_profiles(&config.profiles)
    }

    pub fn from_profiles(profiles: &[Profile]) -> Self {
        let mut ladder = Self::default();

        for profile in profiles {
            // a profile without datacenters deploys nothing and cannot gate
            let Some(tier) = profile.first_tier() else {
                continue;
            };
            let rung = || Rung {
                profile: profile.profile_name.clone(),
                first_tier: tier.to_string(),
            };
            match StageRole::of(&profile.profile_name) {
                StageRole::Beta => ladder.beta = Some(rung()),
                StageRole::Nightly => ladder.nightly = Some(rung()),
                _ => {}
            }
        }

        ladder
    }

    pub fn has_beta(&self) -> bool {
        self.beta.is_some()
    }

    pub fn has_nightly(&self) -> bool {
        self.nightly.is_some()
    }
}

/// How one profile is reached on the ladder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionDecision {
    /// Whether the deploy pipelines fire on new registry tags
    pub registry_trigger_enabled: bool,
    /// Whether a `promote-to-<profile>` gate is generated
    pub generate_promotion_gate: bool,
    /// Deploy pipeline the gate waits for; `None` when there is no gate
    pub upstream: Option<PipelineKey>,
}

/// Resolves the decision for `profile` against every rung of the ladder
pub fn resolve(profile: &str, ladder: &Ladder) -> PromotionDecision {
    let role = StageRole::of(profile);

    let registry_trigger_enabled = if !ladder.has_beta() && !ladder.has_nightly() {
        true
    } else {
        match role {
            StageRole::Production | StageRole::Development => false,
            StageRole::Nightly => !ladder.has_beta(),
            _ => true,
        }
    };

    let nightly_upstream = ladder.nightly.as_ref().map(Rung::upstream);
    let (generate_promotion_gate, upstream) = match (role, &ladder.beta) {
        (StageRole::Production, Some(beta)) => (true, nightly_upstream.or_else(|| Some(beta.upstream()))),
        (StageRole::Nightly, Some(beta)) => (true, Some(beta.upstream())),
        (StageRole::Production, None) if ladder.has_nightly() => (true, nightly_upstream),
        _ => (false, None),
    };

    PromotionDecision {
        registry_trigger_enabled,
        generate_promotion_gate,
        upstream,
    }
}
