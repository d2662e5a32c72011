//! Pipeline definition types
//!
//! The JSON shape of a pipeline as stored by the remote orchestration service.
//! Generated pipelines are serialized with these types and remote pipelines
//! are read back into them for reconciliation.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A pipeline definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_config: Option<serde_json::Map<String, serde_json::Value>>,
    pub application: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub expected_artifacts: Vec<ExpectedArtifact>,
    /// Identifier; assigned by the generator for new pipelines and owned by
    /// the remote store once the pipeline exists there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Ordering position, owned by the remote store
    #[serde(default)]
    pub index: i32,
    #[serde(default)]
    pub keep_waiting_pipelines: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_modified_by: String,
    #[serde(default)]
    pub limit_concurrent: bool,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_config: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spel_evaluator: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stages: Vec<Stage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_ts: Option<String>,
}

impl Pipeline {
    /// Triggers of the given kind
    pub fn triggers_of(&self, kind: TriggerKind) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter().filter(move |t| t.kind == kind)
    }

    pub fn stage(&self, ref_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.ref_id == ref_id)
    }

    pub fn expected_artifact(&self, id: &str) -> Option<&ExpectedArtifact> {
        self.expected_artifacts.iter().find(|a| a.id == id)
    }
}

/// Pipeline parameter declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub pinned: bool,
}

// =============================================================================
// Stages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageType {
    Jenkins,
    ManualJudgment,
    DeployManifest,
    #[serde(other)]
    Other,
}

/// One node of a pipeline's execution graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    #[serde(rename = "type")]
    pub stage_type: StageType,
    pub name: String,
    pub ref_id: String,
    /// Stages that must complete before this one starts
    #[serde(default)]
    pub requisite_stage_ref_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_artifact_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moniker: Option<Moniker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_management: Option<TrafficManagement>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_expression_evaluation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub continue_pipeline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fail_pipeline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub restrict_execution_during_time_window: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_execution_window: Option<ExecutionWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub propagate_authentication_context: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_timeout_ms: Option<u64>,
}

impl Stage {
    /// A stage of the given type with no prerequisites and no options set
    pub fn new(stage_type: StageType, name: impl Into<String>, ref_id: impl Into<String>) -> Self {
        Self {
            stage_type,
            name: name.into(),
            ref_id: ref_id.into(),
            requisite_stage_ref_ids: Vec::new(),
            required_artifact_ids: Vec::new(),
            manifest_artifact_id: None,
            account: None,
            cloud_provider: None,
            source: None,
            moniker: None,
            namespace_override: None,
            traffic_management: None,
            skip_expression_evaluation: false,
            master: None,
            job: None,
            parameters: BTreeMap::new(),
            continue_pipeline: false,
            fail_pipeline: false,
            restrict_execution_during_time_window: false,
            restricted_execution_window: None,
            instructions: None,
            propagate_authentication_context: false,
            stage_timeout_ms: None,
        }
    }
}

/// Labels attached to resources created by a manifest stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moniker {
    pub app: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficManagement {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<TrafficOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficOptions {
    #[serde(default)]
    pub enable_traffic: bool,
    #[serde(default)]
    pub services: Vec<String>,
}

/// Time slots in which a stage is allowed to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionWindow {
    /// Days of week, 1 = Sunday
    pub days: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<WindowJitter>,
    pub whitelist: Vec<WindowSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowJitter {
    pub enabled: bool,
    pub max_delay: u32,
    pub min_delay: u32,
    pub skip_manual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSlot {
    pub start_hour: u8,
    pub start_min: u8,
    pub end_hour: u8,
    pub end_min: u8,
}

// =============================================================================
// Triggers
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// New tag pushed to a container registry
    Docker,
    /// Commit on a source-control branch
    Git,
    /// Successful completion of another pipeline
    Pipeline,
    #[serde(other)]
    Other,
}

/// An event source that starts a pipeline
///
/// One flat record for every kind, as the remote service stores it; the
/// fields that do not apply to a kind stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expected_artifact_ids: Vec<String>,
    /// Service account the triggered execution runs as
    #[serde(default, deserialize_with = "null_as_default")]
    pub run_as_user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    /// Identifier of the upstream pipeline, for pipeline triggers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,
}

impl Trigger {
    /// An enabled trigger of the given kind with every optional field unset
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            enabled: true,
            expected_artifact_ids: Vec::new(),
            run_as_user: String::new(),
            account: None,
            organization: None,
            registry: None,
            repository: None,
            tag: None,
            source: None,
            project: None,
            slug: None,
            branch: None,
            application: None,
            pipeline: None,
            status: Vec::new(),
        }
    }
}

// =============================================================================
// Artifacts
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactType {
    #[serde(rename = "docker/image")]
    DockerImage,
    #[serde(rename = "github/file")]
    GithubFile,
    /// Unknown kinds, and artifacts saved without a type
    #[serde(other)]
    #[default]
    Other,
}

/// A concrete artifact reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub artifact_type: ArtifactType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_account: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom_kind: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// An artifact a pipeline expects to be supplied when it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedArtifact {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    /// Used when nothing in the trigger matches
    #[serde(default)]
    pub default_artifact: Artifact,
    /// Predicate applied to incoming artifacts
    #[serde(default)]
    pub match_artifact: Artifact,
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_default_artifact: bool,
    /// Prefer the artifact from the previous successful execution
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_prior_artifact: bool,
}

impl ExpectedArtifact {
    /// Whether the artifact is a manifest file from source control
    pub fn is_manifest(&self) -> bool {
        self.match_artifact.artifact_type == ArtifactType::GithubFile
    }
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub address: String,
    pub level: String,
    /// Message text per pipeline event
    pub message: BTreeMap<String, NotificationMessage>,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub when: Vec<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Reads an explicit `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
