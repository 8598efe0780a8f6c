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

use crate::domain::config::GitConf;
use crate::domain::job::{Identity, SourceRepository};
use crate::domain::pipeline::CloningAgent;
use crate::infrastructure::process::run_command;
use crate::shared::error::{PaasError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const SSH_KEY_FILE: &str = ".ssh-deploy-key";

/// Clones the job's repository with the git command line.
#[derive(Debug, Clone)]
pub struct GitCloningAgent {
    binary: String,
    timeout: Duration,
    target: Option<CloneTarget>,
}

#[derive(Debug, Clone)]
struct CloneTarget {
    url: String,
    branch: String,
    private_key: Option<String>,
    destination: PathBuf,
}

impl GitCloningAgent {
    pub fn new(conf: &GitConf) -> Self {
        Self {
            binary: conf.binary.clone(),
            timeout: Duration::from_secs(conf.timeout),
            target: None,
        }
    }

    async fn write_key(&self, target: &CloneTarget, key: &str) -> Result<KeyFile> {
        let directory = target
            .destination
            .parent()
            .unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(directory).await?;

        let path = directory.join(SSH_KEY_FILE);
        // Guard first so a failed write or chmod still removes the file.
        let guard = KeyFile { path: path.clone() };
        let mut content = key.trim_end().to_string();
        content.push('\n');
        tokio::fs::write(&path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(guard)
    }
}

/// Deploy key written next to the checkout. Removed when dropped, which also
/// covers a clone future dropped by a deadline or cancellation.
#[derive(Debug)]
struct KeyFile {
    path: PathBuf,
}

impl Drop for KeyFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "deploy key not removed"),
        }
    }
}

#[async_trait]
impl CloningAgent for GitCloningAgent {
    fn configure(&mut self, repository: &SourceRepository, destination: &Path) -> Result<()> {
        let SourceRepository::Git {
            pull_url,
            default_branch,
            identity,
        } = repository;

        let private_key = match identity {
            None => None,
            Some(Identity::Ssh { private_key, .. }) => Some(private_key.clone()),
            Some(other) => {
                return Err(PaasError::Clone(format!(
                    "identity '{}' cannot authenticate a git repository",
                    other.name()
                )))
            }
        };

        self.target = Some(CloneTarget {
            url: pull_url.clone(),
            branch: default_branch.clone(),
            private_key,
            destination: destination.to_path_buf(),
        });
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| PaasError::contract("cloning agent is not configured"))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--branch")
            .arg(&target.branch)
            .arg(&target.url)
            .arg(&target.destination)
            .env("GIT_TERMINAL_PROMPT", "0");

        let key_file = match &target.private_key {
            Some(key) => {
                let key_file = self.write_key(target, key).await?;
                cmd.env(
                    "GIT_SSH_COMMAND",
                    format!(
                        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
                        key_file.path.display()
                    ),
                );
                Some(key_file)
            }
            None => None,
        };

        info!(url = %target.url, branch = %target.branch, "cloning repository");
        let result = run_command(&mut cmd, "git clone", self.timeout).await;
        drop(key_file);

        result.map(|_| ()).map_err(PaasError::Clone)
    }
}
