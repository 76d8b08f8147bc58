use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::Config;
use crate::generator::{ObjectSet, generate_objects};
use crate::pipeline::UploadPipeline;
use crate::pipeline::scanner::VerificationScanner;
use crate::storage::{ResourceManager, StorageProvider};
use crate::types::token::PipelineCancellationToken;
use crate::types::{
    RESOURCE_GROUP_API_REGION, SERVICE_INSTANCE_TYPE, SERVICE_PLAN, SERVICE_TYPE, ServiceInstance,
    SyncSpec, location_constraint,
};

pub mod command;
pub mod spec_file;

/// Seam to the external sync operation. The production implementation shells
/// out to the CLI under test; tests substitute an in-process copy.
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    async fn sync(&self, spec_file: &Path, specs: &[SyncSpec]) -> Result<()>;
}

/// All cross-step state of one scenario run. Owned by the orchestrator and
/// threaded through the steps explicitly; released on cleanup whatever the
/// outcome.
pub struct ScenarioContext {
    pub specs: Vec<SyncSpec>,
    pub objects: Option<ObjectSet>,
    pub spec_file: Option<NamedTempFile>,
    pub created_instances: Vec<ServiceInstance>,
}

impl ScenarioContext {
    fn new(specs: Vec<SyncSpec>) -> Self {
        Self {
            specs,
            objects: None,
            spec_file: None,
            created_instances: Vec::new(),
        }
    }
}

/// One end-to-end scenario:
/// Init -> Provision -> Seed -> Trigger -> Verify -> Cleanup.
///
/// A failure in any step aborts the remaining steps and falls through to
/// Cleanup, which always runs and never masks the earlier failure.
pub struct Scenario {
    config: Config,
    resource_manager: Arc<dyn ResourceManager>,
    storage_provider: Arc<dyn StorageProvider>,
    trigger: Arc<dyn SyncTrigger>,
    cancellation_token: PipelineCancellationToken,
}

impl Scenario {
    pub fn new(
        config: Config,
        resource_manager: Arc<dyn ResourceManager>,
        storage_provider: Arc<dyn StorageProvider>,
        trigger: Arc<dyn SyncTrigger>,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            config,
            resource_manager,
            storage_provider,
            trigger,
            cancellation_token,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let mut context = self.init();

        let result = self.execute(&mut context).await;
        self.cleanup(&mut context).await;

        result
    }

    fn init(&self) -> ScenarioContext {
        info!(
            sources = self.config.sources,
            targets_per_source = self.config.targets_per_source,
            "generate sync spec."
        );

        let mut rng = rand::thread_rng();
        let specs = (0..self.config.sources)
            .map(|_| SyncSpec::generate(self.config.targets_per_source, &mut rng))
            .collect();

        ScenarioContext::new(specs)
    }

    async fn execute(&self, context: &mut ScenarioContext) -> Result<()> {
        self.provision(context).await?;
        self.seed(context).await?;
        self.trigger_sync(context).await?;
        self.verify(context).await?;

        Ok(())
    }

    async fn provision(&self, context: &mut ScenarioContext) -> Result<()> {
        info!("provision service instances and buckets.");

        let resource_groups = self.resource_manager.list_resource_groups().await?;
        let resource_group = resource_groups
            .first()
            .ok_or_else(|| anyhow!("no resource group available"))?;

        for spec in &context.specs {
            let existing = self
                .resource_manager
                .list_service_instances(SERVICE_INSTANCE_TYPE, &spec.source.cos)
                .await?;
            let instance = match existing.into_iter().next() {
                Some(instance) => {
                    info!(instance = instance.name, "service instance already exists.");
                    instance
                }
                None => self
                    .resource_manager
                    .create_service_instance(
                        &spec.source.cos,
                        SERVICE_TYPE,
                        SERVICE_PLAN,
                        resource_group,
                        RESOURCE_GROUP_API_REGION,
                    )
                    .await
                    .with_context(|| {
                        format!("failed to create service instance {}", spec.source.cos)
                    })?,
            };
            // Track immediately, so cleanup removes the instance even if a
            // later provisioning call fails.
            context.created_instances.push(instance);

            let source_storage = self
                .storage_provider
                .storage_for(&spec.source.cos, spec.source.region)
                .await?;
            let constraint = location_constraint(spec.source.region, spec.source.plan);
            info!(
                bucket = spec.source.bucket,
                location_constraint = constraint,
                "create source bucket."
            );
            source_storage
                .create_bucket(&spec.source.bucket, &constraint)
                .await?;
            source_storage
                .wait_until_bucket_exists(&spec.source.bucket)
                .await?;

            for target in &spec.target {
                let target_storage = self
                    .storage_provider
                    .storage_for(&spec.source.cos, target.region)
                    .await?;
                let constraint = location_constraint(target.region, target.plan);
                info!(
                    bucket = target.bucket,
                    location_constraint = constraint,
                    "create target bucket."
                );
                target_storage
                    .create_bucket(&target.bucket, &constraint)
                    .await?;
                target_storage
                    .wait_until_bucket_exists(&target.bucket)
                    .await?;
            }
        }

        Ok(())
    }

    async fn seed(&self, context: &mut ScenarioContext) -> Result<()> {
        let objects = generate_objects(self.config.object_count, self.config.object_size)?;

        for spec in &context.specs {
            let storage = self
                .storage_provider
                .storage_for(&spec.source.cos, spec.source.region)
                .await?;
            let pipeline = UploadPipeline::new(
                storage,
                self.config.worker_size,
                self.config.upload_timeout,
                self.cancellation_token.clone(),
            );

            pipeline
                .upload_all(objects.files(), &spec.source.bucket)
                .await
                .with_context(|| {
                    format!("failed to seed source bucket {}", spec.source.bucket)
                })?;
        }

        context.objects = Some(objects);
        Ok(())
    }

    async fn trigger_sync(&self, context: &mut ScenarioContext) -> Result<()> {
        let spec_file = spec_file::write_spec_file(&context.specs)?;

        info!(spec_file = %spec_file.path().display(), "trigger sync.");
        let result = self.trigger.sync(spec_file.path(), &context.specs).await;

        context.spec_file = Some(spec_file);
        result
    }

    async fn verify(&self, context: &ScenarioContext) -> Result<()> {
        let objects = context
            .objects
            .as_ref()
            .ok_or_else(|| anyhow!("scenario has not been seeded"))?;
        let expected = objects.object_names();

        for spec in &context.specs {
            let filter = if spec.source.object.is_empty() {
                None
            } else {
                Some(Regex::new(&spec.source.object).with_context(|| {
                    format!("invalid object filter: {}", spec.source.object)
                })?)
            };

            for target in &spec.target {
                let storage = self
                    .storage_provider
                    .storage_for(&spec.source.cos, target.region)
                    .await?;
                let scanner = VerificationScanner::new(storage, self.config.scan_backoff);

                scanner
                    .verify(&target.bucket, filter.as_ref(), &expected)
                    .await?;
            }
        }

        Ok(())
    }

    /// Always runs, even after an earlier failure. Errors are logged and
    /// never escalate over a result already being reported.
    async fn cleanup(&self, context: &mut ScenarioContext) {
        info!("cleanup scenario resources.");

        for instance in context.created_instances.drain(..) {
            if let Err(e) = self
                .resource_manager
                .delete_service_instance(&instance.id, false)
                .await
            {
                warn!(
                    instance = instance.name,
                    error = e.to_string(),
                    "failed to delete service instance."
                );
            }
        }

        // Scratch objects and the spec file are removed on drop.
        context.objects = None;
        context.spec_file = None;
    }
}
