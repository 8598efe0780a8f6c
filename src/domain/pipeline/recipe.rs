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

//! The standard deployment recipe.
//!
//! Functional steps are each preceded by a history notification at the same
//! priority, so observers hear about a step before it runs.

use crate::domain::pipeline::plan::Plan;
use crate::domain::pipeline::steps::{
    BuildImages, BuildVolumes, CleanWorkspace, CloneRepository, CompileDeployment,
    ConfigureClusterClient, ConfigureConductor, ConfigureImagesBuilder, DeserializeJob,
    DispatchHistory, DispatchResult, Deploying, Exposing, PrepareWorkspace,
    ReadDeploymentManifest, RunHooks, SetTimeLimit, UnsetTimeLimit,
};
use std::time::Duration;

pub const WORKSPACE_PREPARING: &str = "paas.job.workspace.preparing";
pub const REPOSITORY_CLONING: &str = "paas.job.repository.cloning";
pub const CONDUCTOR_CONFIGURING: &str = "paas.job.conductor.configuring";
pub const MANIFEST_READING: &str = "paas.job.manifest.reading";
pub const DEPLOYMENT_COMPILING: &str = "paas.job.deployment.compiling";
pub const HOOKS_RUNNING: &str = "paas.job.hooks.running";
pub const BUILDER_CONFIGURING: &str = "paas.job.builder.configuring";
pub const IMAGES_BUILDING: &str = "paas.job.images.building";
pub const VOLUMES_BUILDING: &str = "paas.job.volumes.building";
pub const CLUSTERS_CONFIGURING: &str = "paas.job.clusters.configuring";
pub const DEPLOYING: &str = "paas.job.deploying";
pub const EXPOSING: &str = "paas.job.exposing";

pub fn deployment_plan(time_limit: Duration) -> Plan {
    Plan::builder()
        .step(5, DeserializeJob)
        .step(7, SetTimeLimit::new(time_limit))
        .step(10, DispatchHistory::new(WORKSPACE_PREPARING))
        .step(10, PrepareWorkspace)
        .step(20, DispatchHistory::new(REPOSITORY_CLONING))
        .step(20, CloneRepository)
        .step(30, DispatchHistory::new(CONDUCTOR_CONFIGURING))
        .step(30, ConfigureConductor)
        .step(40, DispatchHistory::new(MANIFEST_READING))
        .step(40, ReadDeploymentManifest)
        .step(50, DispatchHistory::new(DEPLOYMENT_COMPILING))
        .step(50, CompileDeployment)
        .step(60, DispatchHistory::new(HOOKS_RUNNING))
        .step(60, RunHooks)
        .step(70, DispatchHistory::new(BUILDER_CONFIGURING))
        .step(70, ConfigureImagesBuilder)
        .step(80, DispatchHistory::new(IMAGES_BUILDING))
        .step(80, BuildImages)
        .step(90, DispatchHistory::new(VOLUMES_BUILDING))
        .step(90, BuildVolumes)
        .step(100, DispatchHistory::new(CLUSTERS_CONFIGURING))
        .step(100, ConfigureClusterClient)
        .step(110, DispatchHistory::new(DEPLOYING))
        .step(110, Deploying)
        .step(120, DispatchHistory::new(EXPOSING))
        .step(120, Exposing)
        .step(130, UnsetTimeLimit)
        .step(140, DispatchResult)
        .step(150, CleanWorkspace)
        .on_error(UnsetTimeLimit)
        .on_error(DispatchResult)
        .build()
}
