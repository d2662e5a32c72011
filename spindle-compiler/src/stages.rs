//! Stage and notification builders

use spindle_core::domain::pipeline::{
    ExecutionWindow, Moniker, Notification, NotificationMessage, Stage, StageType,
    TrafficManagement, TrafficOptions, WindowSlot,
};
use std::collections::BTreeMap;

/// Gate timeout, 10 hours
pub const PROMOTION_TIMEOUT_MS: u64 = 10 * 60 * 60 * 1000;

/// Build job that is shared between applications and told which one to build
pub const PARAMETRISED_JOB: &str = "parametrised_job";

const JENKINS_MASTER: &str = "default-jenkins";
const BUILD_BRANCH: &str = "origin/master";

/// SpEL expression listing the image references of the triggering execution
const TRIGGER_IMAGES: &str = "${ trigger['artifacts'].?[type == 'docker/image'].![reference] }";

/// Reference id and name of the stage deploying the manifest at `path`
pub fn deploy_ref(path: &str) -> String {
    format!("Deploy {}", path)
}

/// Runs the application's build job
///
/// Builds are only allowed on weekday mornings.
pub fn jenkins_build(job: &str, application: &str) -> Stage {
    let mut stage = Stage::new(StageType::Jenkins, "Jenkins", "1");
    stage.master = Some(JENKINS_MASTER.to_string());
    stage.job = Some(job.to_string());
    stage.fail_pipeline = true;

    if job == PARAMETRISED_JOB {
        stage.parameters = BTreeMap::from([
            ("MODULE_NAME".to_string(), application.to_string()),
            ("RELEASE_TAG".to_string(), BUILD_BRANCH.to_string()),
        ]);
    }

    stage.restrict_execution_during_time_window = true;
    stage.restricted_execution_window = Some(ExecutionWindow {
        days: vec![2, 3, 4, 5, 6],
        jitter: None,
        whitelist: vec![WindowSlot {
            start_hour: 7,
            start_min: 0,
            end_hour: 11,
            end_min: 0,
        }],
    });

    stage
}

/// Waits for a human to approve the promotion to `profile`
pub fn manual_judgment(profile: &str) -> Stage {
    let mut stage = Stage::new(StageType::ManualJudgment, "Manual Judgment", "1");
    stage.fail_pipeline = true;
    stage.propagate_authentication_context = true;
    stage.stage_timeout_ms = Some(PROMOTION_TIMEOUT_MS);
    stage.instructions = Some(format!(
        "Continue deploy docker image\n\n<b>{}</b>\n\nto {} environment?",
        TRIGGER_IMAGES, profile
    ));
    stage
}

/// Applies the manifest at `path` to the cluster `tier`
pub fn deploy_manifest(tier: &str, application: &str, namespace: &str, path: &str) -> Stage {
    let ref_id = deploy_ref(path);
    let mut stage = Stage::new(StageType::DeployManifest, ref_id.clone(), ref_id);
    stage.account = Some(tier.to_string());
    stage.cloud_provider = Some("kubernetes".to_string());
    stage.source = Some("artifact".to_string());
    stage.manifest_artifact_id = Some(path.to_string());
    stage.moniker = Some(Moniker {
        app: application.to_string(),
    });
    stage.namespace_override = Some(namespace.to_string());
    stage.traffic_management = Some(TrafficManagement {
        enabled: false,
        options: Some(TrafficOptions::default()),
    });
    stage
}

/// Posts deploy start, failure and completion to `channel`
pub fn deploy_notification(channel: &str) -> Notification {
    let events = ["pipeline.starting", "pipeline.failed", "pipeline.complete"];
    let text = format!("*Deploy* {}\n*User:* ${{ trigger['user'] }}", TRIGGER_IMAGES);

    Notification {
        id: None,
        address: channel.to_string(),
        level: "pipeline".to_string(),
        message: events
            .iter()
            .map(|event| (event.to_string(), NotificationMessage { text: text.clone() }))
            .collect(),
        notification_type: "slack".to_string(),
        when: events.iter().map(|event| event.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jenkins_build_is_windowed() {
        let stage = jenkins_build("orders-build", "orders");

        assert_eq!(stage.stage_type, StageType::Jenkins);
        assert!(stage.requisite_stage_ref_ids.is_empty());
        assert!(stage.parameters.is_empty());
        assert!(stage.restrict_execution_during_time_window);
        let window = stage.restricted_execution_window.unwrap();
        assert_eq!(window.days, vec![2, 3, 4, 5, 6]);
        assert_eq!(window.whitelist[0].start_hour, 7);
        assert_eq!(window.whitelist[0].end_hour, 11);
    }

    #[test]
    fn test_parametrised_job() {
        let stage = jenkins_build(PARAMETRISED_JOB, "orders");
        assert_eq!(stage.parameters["MODULE_NAME"], "orders");
        assert_eq!(stage.parameters["RELEASE_TAG"], "origin/master");
    }

    #[test]
    fn test_manual_judgment() {
        let stage = manual_judgment("production");
        assert_eq!(stage.stage_timeout_ms, Some(36_000_000));
        assert!(stage.instructions.unwrap().ends_with("to production environment?"));
    }

    #[test]
    fn test_deploy_manifest() {
        let stage = deploy_manifest("gke1", "orders", "shop", "datacenters/gke1/shop/orders.yaml");

        assert_eq!(stage.ref_id, "Deploy datacenters/gke1/shop/orders.yaml");
        assert_eq!(stage.name, stage.ref_id);
        assert_eq!(stage.account.as_deref(), Some("gke1"));
        assert_eq!(stage.manifest_artifact_id.as_deref(), Some("datacenters/gke1/shop/orders.yaml"));
        assert_eq!(stage.namespace_override.as_deref(), Some("shop"));
    }

    #[test]
    fn test_notification_template() {
        let notification = deploy_notification("#deploys");

        assert_eq!(notification.when.len(), 3);
        assert_eq!(notification.message.len(), 3);
        let text = &notification.message["pipeline.failed"].text;
        assert!(text.starts_with("*Deploy* ${ trigger['artifacts']"));
        assert!(text.ends_with("*User:* ${ trigger['user'] }"));
    }
}
