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

//! Engine configuration, loaded from TOML.

use crate::domain::compiler::ImageDefinition;
use crate::shared::error::{PaasError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::read_to_string;

// ============================================================================
// Main engine configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub workspace: WorkspaceConf,
    pub compiler: CompilerConf,
    pub builder: BuilderConf,
    pub git: GitConf,
    pub pipeline: PipelineConf,
    /// Command hooks available to manifests, by hook name.
    pub hooks: BTreeMap<String, HookConf>,
    /// Image library merged under every manifest's `images` section.
    pub images: BTreeMap<String, ImageDefinition>,
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn from<T: AsRef<str>>(path: T) -> Result<Self> {
        let content = read_to_string(path.as_ref()).map_err(|e| {
            PaasError::config_error(format!(
                "Failed to read config file {}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let conf: Self = toml::from_str(&content)?;
        Ok(conf)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workspace.root.trim().is_empty() {
            return Err(PaasError::config_error("workspace.root cannot be empty"));
        }
        if self.workspace.manifest.trim().is_empty() {
            return Err(PaasError::config_error("workspace.manifest cannot be empty"));
        }
        if self.builder.binary.trim().is_empty() {
            return Err(PaasError::config_error("builder.binary cannot be empty"));
        }
        if self.git.binary.trim().is_empty() {
            return Err(PaasError::config_error("git.binary cannot be empty"));
        }
        if self.pipeline.time_limit == 0 {
            return Err(PaasError::config_error(
                "pipeline.time_limit must be greater than 0",
            ));
        }
        if self.builder.timeout == 0 || self.git.timeout == 0 {
            return Err(PaasError::config_error(
                "builder.timeout and git.timeout must be greater than 0",
            ));
        }

        for (name, image) in &self.images {
            if image.path.as_deref().map_or(true, str::is_empty) {
                return Err(PaasError::config_error(format!(
                    "library image '{}' must have a path",
                    name
                )));
            }
        }

        for (name, hook) in &self.hooks {
            if hook.command.trim().is_empty() {
                return Err(PaasError::config_error(format!(
                    "hook '{}' must have a command",
                    name
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConf {
    pub root: String,
    /// Manifest file name, relative to the checkout.
    pub manifest: String,
    pub checkout_dir: String,
}

impl Default for WorkspaceConf {
    fn default() -> Self {
        Self {
            root: "/var/lib/paas-deploy/workspaces".to_string(),
            manifest: ".paas.yaml".to_string(),
            checkout_dir: "repository".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConf {
    pub default_storage_class: Option<String>,
    pub default_storage_size: String,
    pub default_ingress_provider: Option<String>,
}

impl Default for CompilerConf {
    fn default() -> Self {
        Self {
            default_storage_class: None,
            default_storage_size: "1Gi".to_string(),
            default_ingress_provider: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConf {
    pub binary: String,
    /// Seconds allowed for one build or push.
    pub timeout: u64,
    /// Base of the images that carry imported volumes.
    pub volume_base_image: String,
    pub tls_verify: bool,
}

impl Default for BuilderConf {
    fn default() -> Self {
        Self {
            binary: "buildah".to_string(),
            timeout: 600,
            volume_base_image: "alpine:3.20".to_string(),
            tls_verify: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConf {
    pub binary: String,
    pub timeout: u64,
}

impl Default for GitConf {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            timeout: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConf {
    /// Wall-clock budget of one job, in seconds.
    pub time_limit: u64,
}

impl Default for PipelineConf {
    fn default() -> Self {
        Self { time_limit: 1800 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConf {
    pub command: String,
    pub timeout: u64,
}

impl Default for HookConf {
    fn default() -> Self {
        Self {
            command: String::new(),
            timeout: 300,
        }
    }
}
