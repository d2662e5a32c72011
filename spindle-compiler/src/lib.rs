//! Spindle Pipeline Compiler
//!
//! Turns one application configuration into the full set of pipeline
//! definitions it needs and reconciles them against the remote store.
//!
//! The pieces, in the order a run uses them:
//! - `identity`: mints an identifier for every pipeline before any is built
//! - `policy`: decides promotion gates and registry triggers per profile
//! - `topology`: builds the build, promotion and deploy pipelines
//!   (with `artifacts`, `stages` and `triggers` as the building blocks)
//! - `reconcile`: merges remote-owned fields into compiled pipelines and
//!   saves them through a `store::PipelineStore`

pub mod artifacts;
pub mod error;
pub mod identity;
pub mod policy;
pub mod reconcile;
pub mod settings;
pub mod stages;
pub mod store;
pub mod topology;
pub mod triggers;
pub mod versions;

pub use error::{CompileError, ReconcileError};
pub use identity::{IdentityMap, PipelineKey, ResolvedIds};
pub use policy::{Ladder, PromotionDecision, StageRole};
pub use reconcile::{Outcome, Reconciled, Reconciler, RemoteOwned, merge};
pub use settings::CompilerSettings;
pub use store::{PipelineStore, TagLookup};
pub use topology::{Compiler, compile_application};
pub use versions::{ArtifactVersions, resolve_versions};
