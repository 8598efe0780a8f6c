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

//! Running external tools (git, the image builder, hook commands).

use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs a command to completion within `timeout`. The child is killed if the
/// caller stops waiting, e.g. when a job is cancelled.
///
/// The error is a human readable reason; callers wrap it into their own
/// error kind.
pub async fn run_command(
    cmd: &mut Command,
    description: &str,
    timeout: Duration,
) -> Result<CommandOutput, String> {
    debug!("{}", description);
    cmd.kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| {
            warn!("{} timed out after {:?}", description, timeout);
            format!("{} timed out after {:?}", description, timeout)
        })?
        .map_err(|e| {
            warn!("{} spawn failed: {}", description, e);
            format!("{}: failed to execute: {}", description, e)
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        debug!("{} succeeded", description);
        Ok(CommandOutput { stdout, stderr })
    } else {
        let reason = if stderr.trim().is_empty() {
            format!("{} exited with {}", description, output.status)
        } else {
            format!("{} failed: {}", description, stderr.trim())
        };
        warn!("{}", reason);
        Err(reason)
    }
}
