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

use crate::domain::compiler::Conductor;
use crate::domain::config::WorkspaceConf;
use crate::domain::hook::Hook;
use crate::domain::job::JobUnit;
use crate::domain::pipeline::{CloningAgent, Workspace};
use crate::shared::error::{PaasError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A workspace under a local directory, one sub directory per job.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    base: PathBuf,
    manifest: String,
    checkout_dir: String,
    job: Option<JobUnit>,
}

impl LocalWorkspace {
    pub fn new(conf: &WorkspaceConf) -> Self {
        Self {
            base: PathBuf::from(&conf.root),
            manifest: conf.manifest.clone(),
            checkout_dir: conf.checkout_dir.clone(),
            job: None,
        }
    }

    fn job(&self) -> Result<&JobUnit> {
        self.job
            .as_ref()
            .ok_or_else(|| PaasError::contract("workspace has no job"))
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl Workspace for LocalWorkspace {
    async fn set_job(&mut self, job: &JobUnit) -> Result<()> {
        if !is_plain_relative(Path::new(job.id())) || job.id().contains('/') {
            return Err(PaasError::Workspace(format!(
                "job id '{}' cannot be used as a directory name",
                job.id()
            )));
        }

        self.job = Some(job.clone());
        let root = self.root()?;
        fs::create_dir_all(&root).await.map_err(|e| {
            PaasError::Workspace(format!("cannot create {}: {}", root.display(), e))
        })?;
        info!(job_id = %job.id(), path = %root.display(), "workspace ready");
        Ok(())
    }

    fn root(&self) -> Result<PathBuf> {
        Ok(self.base.join(self.job()?.id()))
    }

    fn checkout_path(&self) -> Result<PathBuf> {
        Ok(self.root()?.join(&self.checkout_dir))
    }

    async fn clean(&self) -> Result<()> {
        let root = self.root()?;
        match fs::remove_dir_all(&root).await {
            Ok(()) => {
                debug!(path = %root.display(), "workspace removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PaasError::Workspace(format!(
                "cannot remove {}: {}",
                root.display(),
                e
            ))),
        }
    }

    async fn write_file(&self, relative: &Path, content: &[u8]) -> Result<()> {
        if !is_plain_relative(relative) {
            return Err(PaasError::Workspace(format!(
                "'{}' is not a path inside the workspace",
                relative.display()
            )));
        }

        let path = self.checkout_path()?.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;
        Ok(())
    }

    async fn prepare_repository(&self, agent: &mut dyn CloningAgent) -> Result<()> {
        let checkout = self.checkout_path()?;
        agent.configure(self.job()?.source_repository(), &checkout)?;
        agent.run().await
    }

    async fn load_deployment_into_conductor(&self, conductor: &mut Conductor) -> Result<()> {
        let path = self.checkout_path()?.join(&self.manifest);
        let raw = fs::read_to_string(&path).await.map_err(|e| {
            PaasError::Workspace(format!("cannot read manifest {}: {}", path.display(), e))
        })?;
        conductor.prepare(&raw)
    }

    async fn run_in_root(&self, hook: &mut dyn Hook) -> Result<()> {
        hook.set_path(&self.checkout_path()?);
        hook.run().await
    }
}
