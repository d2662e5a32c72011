//! Pipeline topology compiler
//!
//! Builds every pipeline of one application:
//! - one `build-image` pipeline running the application's build job
//! - one `promote-to-<profile>` gate per profile the policy gates
//! - one `deploy-<tier>-dc(<profile>)` pipeline per datacenter
//!
//! Pipelines refer to each other only through identifiers taken from
//! [`ResolvedIds`], so building never mints or changes an identifier.

use spindle_core::domain::config::{Configuration, Datacenter, GEOIP_DEPENDENCY, Profile};
use spindle_core::domain::pipeline::{ExpectedArtifact, Pipeline, Stage};

use crate::artifacts::{self, GEOIP_IMAGE};
use crate::error::CompileError;
use crate::identity::{IdentityMap, PipelineKey, ResolvedIds};
use crate::policy::{self, Ladder, PromotionDecision, StageRole};
use crate::settings::CompilerSettings;
use crate::stages;
use crate::store::TagLookup;
use crate::triggers;
use crate::versions::{ArtifactVersions, resolve_versions};

pub const BUILD_PIPELINE: &str = "build-image";

/// Role allowed to run every generated pipeline
const ADMIN_ROLE: &str = "devops";
const SPEL_EVALUATOR: &str = "v4";

pub fn promotion_pipeline_name(profile: &str) -> String {
    format!("promote-to-{}", profile)
}

pub fn deploy_pipeline_name(tier: &str, profile: &str) -> String {
    format!("deploy-{}-dc({})", tier, profile)
}

/// Validates, resolves image tags and compiles every pipeline of `config`
pub async fn compile_application(
    config: &Configuration,
    settings: &CompilerSettings,
    registry: &dyn TagLookup,
) -> Result<Vec<Pipeline>, CompileError> {
    config.validate()?;

    let ids = IdentityMap::assign(config);
    let versions = resolve_versions(config, &settings.organization, registry).await?;

    Compiler::new(config, settings, &versions).compile(&ids)
}

/// Compiles the pipelines of one application
pub struct Compiler<'a> {
    config: &'a Configuration,
    settings: &'a CompilerSettings,
    versions: &'a ArtifactVersions,
    ladder: Ladder,
}

impl<'a> Compiler<'a> {
    pub fn new(
        config: &'a Configuration,
        settings: &'a CompilerSettings,
        versions: &'a ArtifactVersions,
    ) -> Self {
        Self {
            config,
            settings,
            versions,
            ladder: Ladder::of(config),
        }
    }

    pub fn config(&self) -> &'a Configuration {
        self.config
    }

    pub fn decision(&self, profile: &str) -> PromotionDecision {
        policy::resolve(profile, &self.ladder)
    }

    /// Profiles in promotion order: beta, then nightly, then the rest in
    /// configuration order
    ///
    /// Every gate's upstream deploy pipeline comes before the gate.
    pub fn profiles_in_order(&self) -> Vec<&'a Profile> {
        let mut profiles: Vec<&'a Profile> = self.config.profiles.iter().collect();
        profiles.sort_by_key(|p| match StageRole::of(&p.profile_name) {
            StageRole::Beta => 0,
            StageRole::Nightly => 1,
            _ => 2,
        });
        profiles
    }

    /// Every pipeline of the application in dependency order, using only
    /// pre-assigned identifiers
    pub fn compile(&self, ids: &IdentityMap) -> Result<Vec<Pipeline>, CompileError> {
        let resolved = ResolvedIds::new(ids);
        let mut pipelines = vec![self.build_pipeline()];

        for profile in self.profiles_in_order() {
            pipelines.extend(self.promotion_pipeline(profile, &resolved)?);
            for datacenter in &profile.datacenters {
                pipelines.push(self.deploy_pipeline(profile, datacenter, &resolved)?);
            }
        }

        Ok(pipelines)
    }

    pub fn build_pipeline(&self) -> Pipeline {
        Pipeline {
            spel_evaluator: Some(SPEL_EVALUATOR.to_string()),
            stages: vec![stages::jenkins_build(
                &self.config.jenkins_job_name,
                &self.config.application,
            )],
            ..self.pipeline(BUILD_PIPELINE.to_string())
        }
    }

    /// The manual gate in front of `profile`, when the policy asks for one
    ///
    /// A profile without datacenters gets no gate since no deploy pipeline
    /// would wait on it.
    pub fn promotion_pipeline(
        &self,
        profile: &Profile,
        ids: &ResolvedIds<'_>,
    ) -> Result<Option<Pipeline>, CompileError> {
        let decision = self.decision(&profile.profile_name);
        if !decision.generate_promotion_gate || profile.datacenters.is_empty() {
            return Ok(None);
        }

        let name = promotion_pipeline_name(&profile.profile_name);
        let upstream = decision
            .upstream
            .ok_or_else(|| CompileError::UnresolvedUpstream {
                application: self.config.application.clone(),
                pipeline: name.clone(),
            })?;
        let upstream_id = self.reference(ids, &upstream)?;
        let id = self.identity(ids, &PipelineKey::promotion(&profile.profile_name))?;

        Ok(Some(Pipeline {
            app_config: Some(Default::default()),
            id: Some(id),
            roles: self.roles(),
            spel_evaluator: Some(SPEL_EVALUATOR.to_string()),
            stages: vec![stages::manual_judgment(&profile.profile_name)],
            triggers: vec![triggers::upstream_pipeline(
                self.settings,
                &self.config.application,
                &self.config.owners,
                &upstream_id,
            )],
            ..self.pipeline(name)
        }))
    }

    /// The deploy pipeline of one datacenter of `profile`
    pub fn deploy_pipeline(
        &self,
        profile: &Profile,
        datacenter: &Datacenter,
        ids: &ResolvedIds<'_>,
    ) -> Result<Pipeline, CompileError> {
        let config = self.config;
        let settings = self.settings;
        let profile_name = profile.profile_name.as_str();
        let tier = datacenter.tier_name.as_str();
        let decision = self.decision(profile_name);

        let mut expected_artifacts = Vec::new();
        let mut deploy_stages = Vec::new();
        let mut deploy_triggers = Vec::new();
        let mut required_artifacts = vec![settings.image_id(&config.docker_image)];

        if config.depends_on(GEOIP_DEPENDENCY) {
            let tag = self
                .versions
                .geoip
                .as_deref()
                .ok_or_else(|| CompileError::MissingVersion {
                    image: settings.image_id(GEOIP_IMAGE),
                })?;
            expected_artifacts.push(artifacts::docker_image(settings, GEOIP_IMAGE, tag));
            required_artifacts.push(settings.image_id(GEOIP_IMAGE));
            deploy_triggers.push(triggers::registry(settings, GEOIP_IMAGE, &config.owners, true));
        }

        let mut prerequisites = Vec::new();
        if config.has_custom_namespace() {
            prerequisites.push(artifacts::namespace_manifest_path(settings, tier, &config.namespace));
        }
        for bundle in self.env_bundles(datacenter) {
            prerequisites.push(artifacts::bundle_manifest_path(settings, bundle));
        }
        for bundle in config.config_bundles() {
            prerequisites.push(artifacts::bundle_manifest_path(settings, bundle));
        }
        for path in &prerequisites {
            let (artifact, stage) = self.manifest_stage(tier, path);
            expected_artifacts.push(artifact);
            deploy_stages.push(stage);
        }

        let manifest = artifacts::application_manifest_path(
            settings,
            tier,
            &config.namespace,
            &config.application,
            profile_name,
        );
        expected_artifacts.push(artifacts::docker_image(
            settings,
            &config.docker_image,
            &self.versions.image,
        ));
        let (artifact, mut stage) = self.manifest_stage(tier, &manifest);
        expected_artifacts.push(artifact);
        stage.requisite_stage_ref_ids = deploy_stages.iter().map(|s: &Stage| s.ref_id.clone()).collect();
        stage.required_artifact_ids = required_artifacts;
        deploy_stages.push(stage);

        deploy_triggers.push(triggers::registry(
            settings,
            &config.docker_image,
            &config.owners,
            decision.registry_trigger_enabled,
        ));
        deploy_triggers.push(triggers::source_control(
            settings,
            &config.owners,
            expected_artifacts
                .iter()
                .filter(|a| a.is_manifest())
                .map(|a| a.id.clone())
                .collect(),
        ));
        if decision.generate_promotion_gate {
            let gate = self.reference(ids, &PipelineKey::promotion(profile_name))?;
            deploy_triggers.push(triggers::upstream_pipeline(
                settings,
                &config.application,
                &config.owners,
                &gate,
            ));
        }

        Ok(Pipeline {
            expected_artifacts,
            id: Some(self.identity(ids, &PipelineKey::deploy(profile_name, tier))?),
            notifications: vec![stages::deploy_notification(&config.slack_channel)],
            parameter_config: Some(Vec::new()),
            roles: self.roles(),
            stages: deploy_stages,
            triggers: deploy_triggers,
            ..self.pipeline(deploy_pipeline_name(tier, profile_name))
        })
    }

    /// Application bundles followed by the datacenter's own, first
    /// occurrence kept
    fn env_bundles<'d>(&'d self, datacenter: &'d Datacenter) -> Vec<&'d str> {
        let mut bundles: Vec<&str> = Vec::new();
        for bundle in self.config.env_from.iter().chain(&datacenter.env_from) {
            if !bundles.contains(&bundle.as_str()) {
                bundles.push(bundle);
            }
        }
        bundles
    }

    fn manifest_stage(&self, tier: &str, path: &str) -> (ExpectedArtifact, Stage) {
        (
            artifacts::manifest_file(self.settings, path),
            stages::deploy_manifest(tier, &self.config.application, &self.config.namespace, path),
        )
    }

    fn pipeline(&self, name: String) -> Pipeline {
        Pipeline {
            application: self.config.application.clone(),
            name,
            keep_waiting_pipelines: false,
            last_modified_by: self.config.owner_email.clone(),
            limit_concurrent: true,
            ..Default::default()
        }
    }

    fn roles(&self) -> Vec<String> {
        let mut roles = vec![ADMIN_ROLE.to_string()];
        if !self.config.owners.is_empty() {
            roles.push(self.config.owners.clone());
        }
        roles
    }

    /// Pre-assigned id of a pipeline being built
    fn identity(&self, ids: &ResolvedIds<'_>, key: &PipelineKey) -> Result<String, CompileError> {
        ids.preassigned(key)
            .map(str::to_string)
            .ok_or_else(|| self.missing(key))
    }

    /// Best known id of a pipeline referred to by a trigger
    fn reference(&self, ids: &ResolvedIds<'_>, key: &PipelineKey) -> Result<String, CompileError> {
        ids.resolve(key)
            .map(str::to_string)
            .ok_or_else(|| self.missing(key))
    }

    fn missing(&self, key: &PipelineKey) -> CompileError {
        CompileError::MissingIdentity {
            application: self.config.application.clone(),
            key: key.to_string(),
        }
    }
}
