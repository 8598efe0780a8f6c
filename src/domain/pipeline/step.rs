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

use crate::domain::pipeline::work_plan::WorkPlan;
use crate::shared::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Progress of one job, in the order a successful run reaches each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Received,
    Deserialized,
    WorkspacePrepared,
    SourceCloned,
    ConductorConfigured,
    ManifestRead,
    DeploymentCompiled,
    HooksRun,
    ImageBuilderConfigured,
    ImagesBuilt,
    VolumesBuilt,
    ClusterClientConfigured,
    Deployed,
    Exposed,
    ResultDispatched,
    Done,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Received => "received",
            JobState::Deserialized => "deserialized",
            JobState::WorkspacePrepared => "workspace_prepared",
            JobState::SourceCloned => "source_cloned",
            JobState::ConductorConfigured => "conductor_configured",
            JobState::ManifestRead => "manifest_read",
            JobState::DeploymentCompiled => "deployment_compiled",
            JobState::HooksRun => "hooks_run",
            JobState::ImageBuilderConfigured => "image_builder_configured",
            JobState::ImagesBuilt => "images_built",
            JobState::VolumesBuilt => "volumes_built",
            JobState::ClusterClientConfigured => "cluster_client_configured",
            JobState::Deployed => "deployed",
            JobState::Exposed => "exposed",
            JobState::ResultDispatched => "result_dispatched",
            JobState::Done => "done",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transformation of the work plan.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    /// State a job is in once this step succeeded, if the step is a
    /// transition of the job state machine.
    fn reaches(&self) -> Option<JobState> {
        None
    }

    async fn execute(&self, plan: &mut WorkPlan) -> Result<()>;
}
