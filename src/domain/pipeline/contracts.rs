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

//! Collaborators the pipeline drives. Each one reports its outcome as a
//! [`Result`]: `Ok` resumes the pipeline, `Err` routes it to the error
//! handlers.

use crate::domain::compiler::Conductor;
use crate::domain::deployment::CompiledDeployment;
use crate::domain::hook::Hook;
use crate::domain::job::{ClusterDefinition, History, Identity, JobUnit, SourceRepository};
use crate::shared::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Per-job staging area holding the checkout and build scratch files.
#[async_trait]
pub trait Workspace: Send + Sync + Debug {
    async fn set_job(&mut self, job: &JobUnit) -> Result<()>;

    /// Directory of the current job.
    fn root(&self) -> Result<PathBuf>;

    /// Directory the source repository is cloned into.
    fn checkout_path(&self) -> Result<PathBuf>;

    async fn clean(&self) -> Result<()>;

    async fn write_file(&self, relative: &Path, content: &[u8]) -> Result<()>;

    async fn prepare_repository(&self, agent: &mut dyn CloningAgent) -> Result<()>;

    async fn load_deployment_into_conductor(&self, conductor: &mut Conductor) -> Result<()>;

    /// Points the hook at the checkout and runs it there.
    async fn run_in_root(&self, hook: &mut dyn Hook) -> Result<()>;
}

#[async_trait]
pub trait CloningAgent: Send + Sync + Debug {
    fn configure(&mut self, repository: &SourceRepository, destination: &Path) -> Result<()>;

    async fn run(&self) -> Result<()>;
}

#[async_trait]
pub trait ImageBuilder: Send + Sync + Debug {
    fn configure(&mut self, project_id: &str, url: &str, auth: Option<&Identity>) -> Result<()>;

    /// Builds and pushes every referenced buildable, then rebinds it to the
    /// registry it was pushed to.
    async fn build_images(
        &self,
        deployment: &mut CompiledDeployment,
        working_path: &Path,
    ) -> Result<()>;

    /// Builds the images carrying content volumes imported by containers.
    async fn build_volumes(
        &self,
        deployment: &mut CompiledDeployment,
        working_path: &Path,
    ) -> Result<()>;
}

#[async_trait]
pub trait ClusterDriver: Send + Sync + Debug {
    async fn configure(&mut self, cluster: &ClusterDefinition) -> Result<()>;

    async fn deploy(&self, deployment: &CompiledDeployment) -> Result<()>;

    async fn expose(&self, deployment: &CompiledDeployment) -> Result<()>;
}

/// Receives every History event of a run, in order.
#[async_trait]
pub trait HistorySink: Send + Sync + Debug {
    async fn dispatch(&self, job_id: &str, history: &History) -> Result<()>;
}
