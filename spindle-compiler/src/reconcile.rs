//! Pipeline reconciliation
//!
//! Compiled pipelines are authoritative for everything except the fields the
//! remote store owns: the pipeline id and index, the service account each
//! trigger runs as and the upstream id pipeline triggers point at. Those are
//! collected into [`RemoteOwned`] and laid over the compiled pipeline by
//! [`merge`] before it is saved.

use spindle_client::ClientError;
use spindle_core::domain::config::Configuration;
use spindle_core::domain::pipeline::{Pipeline, TriggerKind};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::{CompileError, ReconcileError};
use crate::identity::{IdentityMap, PipelineKey, ResolvedIds};
use crate::settings::CompilerSettings;
use crate::store::{PipelineStore, TagLookup};
use crate::topology::Compiler;
use crate::versions::resolve_versions;

/// Fields of a stored pipeline the remote store owns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOwned {
    pub id: Option<String>,
    pub index: i32,
    /// Service account per trigger kind; the last non-empty one wins
    pub run_as_user: BTreeMap<TriggerKind, String>,
    /// Upstream id recorded on the stored pipeline trigger
    pub pipeline_target: Option<String>,
}

impl RemoteOwned {
    pub fn from_remote(remote: &Pipeline) -> Self {
        let mut owned = Self {
            id: remote.id.clone(),
            index: remote.index,
            ..Default::default()
        };

        for trigger in &remote.triggers {
            if !trigger.run_as_user.is_empty() {
                owned
                    .run_as_user
                    .insert(trigger.kind, trigger.run_as_user.clone());
            }
            if trigger.kind == TriggerKind::Pipeline {
                if let Some(target) = trigger.pipeline.as_ref().filter(|t| !t.is_empty()) {
                    owned.pipeline_target = Some(target.clone());
                }
            }
        }

        owned
    }
}

/// Lays the remote-owned fields over a freshly compiled pipeline
///
/// A trigger kind the remote copy has nothing for keeps its compiled values.
pub fn merge(remote: &RemoteOwned, mut compiled: Pipeline) -> Pipeline {
    if remote.id.is_some() {
        compiled.id = remote.id.clone();
    }
    compiled.index = remote.index;

    for trigger in &mut compiled.triggers {
        if let Some(user) = remote.run_as_user.get(&trigger.kind) {
            trigger.run_as_user = user.clone();
        }
        if trigger.kind == TriggerKind::Pipeline {
            if let Some(target) = &remote.pipeline_target {
                trigger.pipeline = Some(target.clone());
            }
        }
    }

    compiled
}

/// Whether a pipeline was created or updated by a reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
}

/// A pipeline as it was saved to the store
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub pipeline: Pipeline,
    pub outcome: Outcome,
}

/// Writes compiled pipelines to a [`PipelineStore`], one at a time
pub struct Reconciler<S> {
    store: S,
}

impl<S: PipelineStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates `compiled`, or updates the stored pipeline of the same name
    /// after merging its remote-owned fields
    ///
    /// # Errors
    /// A lookup rejected with a 4xx status is treated as absent. Any other
    /// lookup failure and every save failure are returned; nothing is retried.
    pub async fn reconcile(&self, compiled: Pipeline) -> Result<Reconciled, ReconcileError> {
        let application = compiled.application.clone();
        let name = compiled.name.clone();

        let remote = match self.store.get_pipeline(&application, &name).await {
            Ok(remote) => remote,
            Err(e) if e.is_client_error() => {
                warn!(
                    application = %application,
                    pipeline = %name,
                    "Lookup rejected ({}), treating pipeline as missing",
                    e
                );
                None
            }
            Err(source) => {
                return Err(ReconcileError::Lookup {
                    application,
                    pipeline: name,
                    source,
                });
            }
        };

        let (pipeline, outcome) = match remote {
            Some(remote) => {
                info!(application = %application, pipeline = %name, "Pipeline exists, updating");
                (merge(&RemoteOwned::from_remote(&remote), compiled), Outcome::Updated)
            }
            None => {
                info!(application = %application, pipeline = %name, "Pipeline missing, creating");
                (compiled, Outcome::Created)
            }
        };

        self.store
            .save_pipeline(&pipeline)
            .await
            .map_err(|source: ClientError| ReconcileError::Save {
                application,
                pipeline: name,
                source,
            })?;

        Ok(Reconciled { pipeline, outcome })
    }

    /// Compiles and reconciles every pipeline of one application
    ///
    /// Pipelines are saved in dependency order. Each saved gate or deploy
    /// pipeline records its stored id so that pipelines compiled after it
    /// point at the id the store actually holds. The first failure aborts the
    /// rest of the application; pipelines saved before it stay saved.
    pub async fn sync_application(
        &self,
        config: &Configuration,
        settings: &CompilerSettings,
        registry: &dyn TagLookup,
    ) -> Result<Vec<Reconciled>, ReconcileError> {
        config.validate().map_err(CompileError::from)?;

        let ids = IdentityMap::assign(config);
        let versions = resolve_versions(config, &settings.organization, registry).await?;
        let compiler = Compiler::new(config, settings, &versions);
        let mut resolved = ResolvedIds::new(&ids);

        let mut saved = vec![self.reconcile(compiler.build_pipeline()).await?];

        for profile in compiler.profiles_in_order() {
            if let Some(gate) = compiler.promotion_pipeline(profile, &resolved)? {
                let result = self.reconcile(gate).await?;
                observe(&mut resolved, PipelineKey::promotion(&profile.profile_name), &result);
                saved.push(result);
            }

            for datacenter in &profile.datacenters {
                let deploy = compiler.deploy_pipeline(profile, datacenter, &resolved)?;
                let result = self.reconcile(deploy).await?;
                observe(
                    &mut resolved,
                    PipelineKey::deploy(&profile.profile_name, &datacenter.tier_name),
                    &result,
                );
                saved.push(result);
            }
        }

        Ok(saved)
    }
}

fn observe(resolved: &mut ResolvedIds<'_>, key: PipelineKey, result: &Reconciled) {
    if let Some(id) = &result.pipeline.id {
        resolved.record(key, id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fakes::{MemoryStore, StaticRegistry};
    use crate::topology::deploy_pipeline_name;
    use spindle_core::domain::pipeline::{Stage, StageType, Trigger};

    fn settings() -> CompilerSettings {
        CompilerSettings::new("acme", "k8s")
    }

    fn registry() -> StaticRegistry {
        StaticRegistry::default().with("orders", &["22.03.01-12.00"])
    }

    fn trigger(kind: TriggerKind, run_as_user: &str) -> Trigger {
        Trigger {
            run_as_user: run_as_user.to_string(),
            ..Trigger::new(kind)
        }
    }

    fn compiled() -> Pipeline {
        let mut pipeline_trigger = trigger(TriggerKind::Pipeline, "");
        pipeline_trigger.pipeline = Some("preassigned-gate".to_string());

        Pipeline {
            application: "orders".to_string(),
            name: "deploy-gke1-dc(production)".to_string(),
            id: Some("preassigned".to_string()),
            stages: vec![Stage::new(StageType::DeployManifest, "Deploy a.yaml", "Deploy a.yaml")],
            triggers: vec![
                trigger(TriggerKind::Docker, "payments-service-account@acme.com"),
                trigger(TriggerKind::Git, ""),
                pipeline_trigger,
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_takes_remote_identity() {
        let remote = Pipeline {
            id: Some("X".to_string()),
            index: 7,
            triggers: vec![
                trigger(TriggerKind::Docker, "svc@x"),
                trigger(TriggerKind::Git, "svc@x"),
                trigger(TriggerKind::Pipeline, "svc@x"),
            ],
            ..Default::default()
        };
        let compiled = compiled();

        let merged = merge(&RemoteOwned::from_remote(&remote), compiled.clone());

        assert_eq!(merged.id.as_deref(), Some("X"));
        assert_eq!(merged.index, 7);
        assert!(merged.triggers.iter().all(|t| t.run_as_user == "svc@x"));
        assert_eq!(merged.stages, compiled.stages);
        assert_eq!(merged.expected_artifacts, compiled.expected_artifacts);
        assert_eq!(merged.triggers[2].pipeline.as_deref(), Some("preassigned-gate"));
    }

    #[test]
    fn test_merge_copies_per_kind() {
        let remote = Pipeline {
            id: Some("X".to_string()),
            triggers: vec![trigger(TriggerKind::Git, "git@x"), trigger(TriggerKind::Docker, "")],
            ..Default::default()
        };

        let merged = merge(&RemoteOwned::from_remote(&remote), compiled());

        assert_eq!(merged.triggers[0].run_as_user, "payments-service-account@acme.com");
        assert_eq!(merged.triggers[1].run_as_user, "git@x");
        assert_eq!(merged.triggers[2].run_as_user, "");
    }

    #[test]
    fn test_merge_overwrites_pipeline_target() {
        let mut upstream = trigger(TriggerKind::Pipeline, "");
        upstream.pipeline = Some("corrected-gate".to_string());
        let remote = Pipeline {
            triggers: vec![upstream],
            ..Default::default()
        };

        let merged = merge(&RemoteOwned::from_remote(&remote), compiled());

        assert_eq!(merged.triggers[2].pipeline.as_deref(), Some("corrected-gate"));
        assert_eq!(merged.triggers[0].pipeline, None);
        assert_eq!(merged.id.as_deref(), Some("preassigned"));
    }

    #[test]
    fn test_merge_without_remote_triggers() {
        let remote = Pipeline {
            id: Some("X".to_string()),
            index: 2,
            ..Default::default()
        };
        let compiled = compiled();

        let merged = merge(&RemoteOwned::from_remote(&remote), compiled.clone());

        assert_eq!(merged.triggers, compiled.triggers);
        assert_eq!(merged.index, 2);
    }

    #[tokio::test]
    async fn test_reconcile_creates_missing() {
        let reconciler = Reconciler::new(MemoryStore::default());

        let result = reconciler.reconcile(compiled()).await.unwrap();

        assert_eq!(result.outcome, Outcome::Created);
        assert_eq!(result.pipeline.id.as_deref(), Some("preassigned"));
        let stored = reconciler
            .store()
            .stored("orders", "deploy-gke1-dc(production)")
            .unwrap();
        assert_eq!(stored.stages, compiled().stages);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let reconciler = Reconciler::new(MemoryStore::default());

        reconciler.reconcile(compiled()).await.unwrap();
        let first = reconciler.store().stored("orders", "deploy-gke1-dc(production)").unwrap();

        let mut regenerated = compiled();
        regenerated.id = Some("fresh-uuid".to_string());
        let result = reconciler.reconcile(regenerated).await.unwrap();
        let second = reconciler.store().stored("orders", "deploy-gke1-dc(production)").unwrap();

        assert_eq!(result.outcome, Outcome::Updated);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rejected_lookup_creates() {
        let store = MemoryStore::default();
        store.fail_next_lookup(ClientError::api_error(403, "forbidden"));
        let reconciler = Reconciler::new(store);

        let result = reconciler.reconcile(compiled()).await.unwrap();
        assert_eq!(result.outcome, Outcome::Created);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_fatal() {
        let store = MemoryStore::default();
        store.fail_next_lookup(ClientError::api_error(503, "unavailable"));
        let reconciler = Reconciler::new(store);

        let err = reconciler.reconcile(compiled()).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Lookup { .. }));
        assert_eq!(err.status(), Some(503));
        assert!(reconciler.store().saved_names().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_carries_context() {
        let store = MemoryStore::default();
        store.reject_save("deploy-gke1-dc(production)", 400);
        let reconciler = Reconciler::new(store);

        let err = reconciler.reconcile(compiled()).await.unwrap_err();

        match &err {
            ReconcileError::Save { application, pipeline, .. } => {
                assert_eq!(application, "orders");
                assert_eq!(pipeline, "deploy-gke1-dc(production)");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_sync_saves_in_dependency_order() {
        let config = Configuration::new("orders", "orders")
            .with_profile("production", &["gke1"])
            .with_profile("beta", &["gke1"]);
        let reconciler = Reconciler::new(MemoryStore::default());

        let saved = reconciler
            .sync_application(&config, &settings(), &registry())
            .await
            .unwrap();

        assert_eq!(saved.len(), 4);
        assert_eq!(
            reconciler.store().saved_names(),
            vec![
                "build-image",
                "deploy-gke1-dc(beta)",
                "promote-to-production",
                "deploy-gke1-dc(production)"
            ]
        );

        let beta_id = saved[1].pipeline.id.clone().unwrap();
        let gate = &saved[2].pipeline;
        assert_eq!(gate.triggers[0].pipeline.as_deref(), Some(beta_id.as_str()));

        let production = &saved[3].pipeline;
        let target = production
            .triggers_of(TriggerKind::Pipeline)
            .next()
            .and_then(|t| t.pipeline.clone());
        assert_eq!(target, gate.id);
    }

    #[tokio::test]
    async fn test_sync_points_at_stored_gate() {
        let config = Configuration::new("orders", "orders")
            .with_profile("beta", &["gke1"])
            .with_profile("production", &["gke1"]);
        let store = MemoryStore::default();
        store.insert(Pipeline {
            application: "orders".to_string(),
            name: "promote-to-production".to_string(),
            id: Some("stored-gate".to_string()),
            index: 4,
            ..Default::default()
        });
        let reconciler = Reconciler::new(store);

        reconciler
            .sync_application(&config, &settings(), &registry())
            .await
            .unwrap();

        let deploy = reconciler
            .store()
            .stored("orders", &deploy_pipeline_name("gke1", "production"))
            .unwrap();
        let target = deploy
            .triggers_of(TriggerKind::Pipeline)
            .next()
            .and_then(|t| t.pipeline.clone());
        assert_eq!(target.as_deref(), Some("stored-gate"));

        let gate = reconciler.store().stored("orders", "promote-to-production").unwrap();
        assert_eq!(gate.index, 4);
    }

    #[tokio::test]
    async fn test_sync_twice_is_stable() {
        let config = Configuration::new("orders", "orders")
            .with_profile("beta", &["gke1"])
            .with_profile("nightly", &["gke2"])
            .with_profile("production", &["gke1", "gke2"]);
        let reconciler = Reconciler::new(MemoryStore::default());

        reconciler
            .sync_application(&config, &settings(), &registry())
            .await
            .unwrap();
        let first = reconciler.store().pipelines.lock().unwrap().clone();

        let second_run = reconciler
            .sync_application(&config, &settings(), &registry())
            .await
            .unwrap();
        let second = reconciler.store().pipelines.lock().unwrap().clone();

        assert!(second_run.iter().all(|r| r.outcome == Outcome::Updated));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sync_aborts_after_failed_save() {
        let config = Configuration::new("orders", "orders")
            .with_profile("beta", &["gke1"])
            .with_profile("production", &["gke1"]);
        let store = MemoryStore::default();
        store.reject_save("promote-to-production", 500);
        let reconciler = Reconciler::new(store);

        let err = reconciler
            .sync_application(&config, &settings(), &registry())
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(
            reconciler.store().saved_names(),
            vec!["build-image", "deploy-gke1-dc(beta)"]
        );
    }

    #[tokio::test]
    async fn test_sync_rejects_invalid_config() {
        let config = Configuration::new("orders", "orders")
            .with_profile("beta", &["gke1"])
            .with_profile("beta", &["gke2"]);
        let reconciler = Reconciler::new(MemoryStore::default());

        let err = reconciler
            .sync_application(&config, &settings(), &registry())
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Compile(CompileError::InvalidConfig(_))));
        assert!(reconciler.store().saved_names().is_empty());
    }
}
