// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The steps of a deployment run.

use crate::domain::job::{History, JobUnit};
use crate::domain::pipeline::step::{JobState, Step};
use crate::domain::pipeline::work_plan::{entry, entry_mut, require, require_mut, WorkPlan};
use crate::shared::error::{PaasError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const JOB_DEPLOYED: &str = "paas.job.deployed";

/// Appends an event to the job history and forwards it to the sink.
async fn record(plan: &mut WorkPlan, message: &str, is_final: bool, extra: Map<String, Value>) -> Result<History> {
    let history = match plan.job.as_ref() {
        Some(job) => {
            let next = job.record(message, Utc::now(), is_final, extra);
            let history = next
                .history()
                .cloned()
                .ok_or_else(|| PaasError::contract("recorded job has no history"))?;
            plan.job = Some(next);
            history
        }
        None => {
            let mut history = History::new(message, Utc::now()).with_extra(extra);
            history.is_final = is_final;
            history
        }
    };

    if let Some(sink) = plan.history_sink.as_ref() {
        let job_id = plan.job.as_ref().map(JobUnit::id).unwrap_or("unknown");
        sink.dispatch(job_id, &history).await?;
    }
    Ok(history)
}

/// Tells observers which step is about to run.
pub struct DispatchHistory {
    message: &'static str,
}

impl DispatchHistory {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

#[async_trait]
impl Step for DispatchHistory {
    fn name(&self) -> &'static str {
        "dispatch_history"
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        record(plan, self.message, false, Map::new()).await?;
        Ok(())
    }
}

pub struct DeserializeJob;

#[async_trait]
impl Step for DeserializeJob {
    fn name(&self) -> &'static str {
        "deserialize_job"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::Deserialized)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        if plan.job.is_some() {
            return Ok(());
        }
        let raw = entry(&plan.raw_job, "job payload")?;
        let job = JobUnit::from_json(raw)?;
        info!(job_id = %job.id(), project = %job.project().name, "job received");
        plan.job = Some(job);
        Ok(())
    }
}

/// Starts the wall-clock budget of the run.
pub struct SetTimeLimit {
    default: Duration,
}

impl SetTimeLimit {
    pub fn new(default: Duration) -> Self {
        Self { default }
    }
}

#[async_trait]
impl Step for SetTimeLimit {
    fn name(&self) -> &'static str {
        "set_time_limit"
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let limit = plan.time_limit.unwrap_or(self.default);
        plan.deadline = Some(Instant::now() + limit);
        debug!(seconds = limit.as_secs(), "time limit set");
        Ok(())
    }
}

pub struct UnsetTimeLimit;

#[async_trait]
impl Step for UnsetTimeLimit {
    fn name(&self) -> &'static str {
        "unset_time_limit"
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        if plan.deadline.take().is_some() {
            debug!("time limit removed");
        }
        Ok(())
    }
}

pub struct PrepareWorkspace;

#[async_trait]
impl Step for PrepareWorkspace {
    fn name(&self) -> &'static str {
        "prepare_workspace"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::WorkspacePrepared)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let job = entry(&plan.job, "job")?;
        require_mut(&mut plan.workspace, "workspace")?
            .set_job(job)
            .await
    }
}

pub struct CloneRepository;

#[async_trait]
impl Step for CloneRepository {
    fn name(&self) -> &'static str {
        "clone_repository"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::SourceCloned)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let workspace = require(&plan.workspace, "workspace")?;
        let agent = require_mut(&mut plan.cloning_agent, "cloning agent")?;
        workspace.prepare_repository(agent).await
    }
}

pub struct ConfigureConductor;

#[async_trait]
impl Step for ConfigureConductor {
    fn name(&self) -> &'static str {
        "configure_conductor"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::ConductorConfigured)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let job = entry(&plan.job, "job")?.clone();
        entry_mut(&mut plan.conductor, "conductor")?.configure(job);
        Ok(())
    }
}

pub struct ReadDeploymentManifest;

#[async_trait]
impl Step for ReadDeploymentManifest {
    fn name(&self) -> &'static str {
        "read_deployment_manifest"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::ManifestRead)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let workspace = require(&plan.workspace, "workspace")?;
        let conductor = entry_mut(&mut plan.conductor, "conductor")?;
        workspace.load_deployment_into_conductor(conductor).await
    }
}

pub struct CompileDeployment;

#[async_trait]
impl Step for CompileDeployment {
    fn name(&self) -> &'static str {
        "compile_deployment"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::DeploymentCompiled)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let deployment = entry(&plan.conductor, "conductor")?.compile_deployment()?;
        plan.deployment = Some(deployment);
        Ok(())
    }
}

/// Runs the build hooks in manifest order, stopping at the first failure.
pub struct RunHooks;

#[async_trait]
impl Step for RunHooks {
    fn name(&self) -> &'static str {
        "run_hooks"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::HooksRun)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let workspace = require(&plan.workspace, "workspace")?;
        let deployment = entry_mut(&mut plan.deployment, "compiled deployment")?;

        for hook in deployment.hooks_mut() {
            info!(hook = %hook.name, "running hook");
            workspace
                .run_in_root(hook.instance.as_mut())
                .await
                .map_err(|e| match e {
                    PaasError::Hook { .. } | PaasError::Timeout(_) | PaasError::Cancelled => e,
                    other => PaasError::hook(hook.name.clone(), other.to_string()),
                })?;
        }
        Ok(())
    }
}

pub struct ConfigureImagesBuilder;

#[async_trait]
impl Step for ConfigureImagesBuilder {
    fn name(&self) -> &'static str {
        "configure_images_builder"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::ImageBuilderConfigured)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let job = entry(&plan.job, "job")?;
        let repository = job.images_repository();
        require_mut(&mut plan.builder, "image builder")?.configure(
            &job.project().id,
            repository.api_url(),
            repository.identity(),
        )
    }
}

pub struct BuildImages;

#[async_trait]
impl Step for BuildImages {
    fn name(&self) -> &'static str {
        "build_images"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::ImagesBuilt)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let working_path = require(&plan.workspace, "workspace")?.checkout_path()?;
        let builder = require(&plan.builder, "image builder")?;
        let deployment = entry_mut(&mut plan.deployment, "compiled deployment")?;
        builder.build_images(deployment, &working_path).await
    }
}

pub struct BuildVolumes;

#[async_trait]
impl Step for BuildVolumes {
    fn name(&self) -> &'static str {
        "build_volumes"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::VolumesBuilt)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let working_path = require(&plan.workspace, "workspace")?.checkout_path()?;
        let builder = require(&plan.builder, "image builder")?;
        let deployment = entry_mut(&mut plan.deployment, "compiled deployment")?;
        builder.build_volumes(deployment, &working_path).await
    }
}

pub struct ConfigureClusterClient;

#[async_trait]
impl Step for ConfigureClusterClient {
    fn name(&self) -> &'static str {
        "configure_cluster_client"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::ClusterClientConfigured)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let job = entry(&plan.job, "job")?;
        let drivers = entry(&plan.drivers, "cluster drivers")?;
        let clusters = drivers.configure_all(job.clusters()).await?;
        plan.clusters = Some(clusters);
        Ok(())
    }
}

pub struct Deploying;

#[async_trait]
impl Step for Deploying {
    fn name(&self) -> &'static str {
        "deploying"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::Deployed)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let deployment = entry(&plan.deployment, "compiled deployment")?;
        entry(&plan.clusters, "cluster collection")?
            .deploy(deployment)
            .await
    }
}

pub struct Exposing;

#[async_trait]
impl Step for Exposing {
    fn name(&self) -> &'static str {
        "exposing"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::Exposed)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let deployment = entry(&plan.deployment, "compiled deployment")?;
        entry(&plan.clusters, "cluster collection")?
            .expose(deployment)
            .await
    }
}

/// Records the final History entry: the success event, or the failure with
/// its stable code.
pub struct DispatchResult;

#[async_trait]
impl Step for DispatchResult {
    fn name(&self) -> &'static str {
        "dispatch_result"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::ResultDispatched)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        if let Some(history) = plan.final_history.as_ref() {
            warn!(message = %history.message, "result already dispatched");
            return Ok(());
        }

        let (message, extra) = match plan.failure.as_ref() {
            None => (JOB_DEPLOYED, Map::new()),
            Some(failure) => {
                let extra = json!({
                    "error": failure.error.to_string(),
                    "step": failure.step,
                    "http_status": failure.error.http_status(),
                });
                let extra = match extra {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                (failure.error.code(), extra)
            }
        };

        let history = record(plan, message, true, extra).await?;
        info!(message = %history.message, "result dispatched");
        plan.final_history = Some(history);
        Ok(())
    }
}

/// Removes the job directory once the job succeeded. The result is already
/// dispatched by then, so a failure here is only logged.
pub struct CleanWorkspace;

#[async_trait]
impl Step for CleanWorkspace {
    fn name(&self) -> &'static str {
        "clean_workspace"
    }

    fn reaches(&self) -> Option<JobState> {
        Some(JobState::Done)
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()> {
        let workspace = require(&plan.workspace, "workspace")?;
        if let Err(e) = workspace.clean().await {
            if plan.final_history.is_none() {
                return Err(e);
            }
            warn!(error = %e, "workspace left behind after a successful job");
        }
        Ok(())
    }
}
