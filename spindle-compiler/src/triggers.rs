//! Trigger builders

use spindle_core::domain::pipeline::{Trigger, TriggerKind};

use crate::settings::CompilerSettings;

/// Tag format of release images, `YY.MM.DD-HH.MM`
pub const RELEASE_TAG_PATTERN: &str = r"^\d{2}\.\d{2}\.\d{2}\-\d{2}\.\d{2}$";

/// Status of the upstream execution a pipeline trigger waits for
pub const SUCCESSFUL: &str = "successful";

/// Fires when a release tag of `image` is pushed
pub fn registry(settings: &CompilerSettings, image: &str, owners: &str, enabled: bool) -> Trigger {
    let mut trigger = Trigger::new(TriggerKind::Docker);
    trigger.enabled = enabled;
    trigger.account = Some(settings.organization.clone());
    trigger.organization = Some(settings.organization.clone());
    trigger.registry = Some(settings.registry_host.clone());
    trigger.repository = Some(settings.image_id(image));
    trigger.tag = Some(RELEASE_TAG_PATTERN.to_string());
    trigger.expected_artifact_ids = vec![settings.image_id(image)];
    trigger.run_as_user = settings.service_account(owners);
    trigger
}

/// Fires on commits to the manifest branch, resolving `artifact_ids`
pub fn source_control(settings: &CompilerSettings, owners: &str, artifact_ids: Vec<String>) -> Trigger {
    let mut trigger = Trigger::new(TriggerKind::Git);
    trigger.source = Some("github".to_string());
    trigger.project = Some(settings.organization.clone());
    trigger.slug = Some(settings.manifest_repository.clone());
    trigger.branch = Some(settings.manifest_branch.clone());
    trigger.expected_artifact_ids = artifact_ids;
    trigger.run_as_user = settings.service_account(owners);
    trigger
}

/// Fires when the pipeline with id `upstream_id` succeeds
pub fn upstream_pipeline(
    settings: &CompilerSettings,
    application: &str,
    owners: &str,
    upstream_id: &str,
) -> Trigger {
    let mut trigger = Trigger::new(TriggerKind::Pipeline);
    trigger.application = Some(application.to_string());
    trigger.pipeline = Some(upstream_id.to_string());
    trigger.status = vec![SUCCESSFUL.to_string()];
    trigger.run_as_user = settings.service_account(owners);
    trigger
}
