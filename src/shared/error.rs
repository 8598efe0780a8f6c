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

use thiserror::Error;
pub type Result<T> = std::result::Result<T, PaasError>;

#[derive(Error, Debug)]
pub enum PaasError {
    #[error("Reference error: {0}")]
    Reference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Variable '{0}' is not defined for this job")]
    Variable(String),

    #[error("Repository clone failed: {0}")]
    Clone(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },

    #[error("Cluster '{cluster}' driver failed: {message}")]
    Driver { cluster: String, message: String },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Time limit exceeded: {0}")]
    Timeout(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Kubernetes API error: {0}")]
    Kube(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<kube::Error> for PaasError {
    fn from(err: kube::Error) -> Self {
        PaasError::Kube(err.to_string())
    }
}

impl PaasError {
    pub fn reference(context: impl Into<String>) -> Self {
        Self::Reference(context.into())
    }

    pub fn config_error(context: impl Into<String>) -> Self {
        Self::Config(context.into())
    }

    pub fn contract(context: impl Into<String>) -> Self {
        Self::Contract(context.into())
    }

    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    pub fn driver(cluster: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver {
            cluster: cluster.into(),
            message: message.into(),
        }
    }

    /// Stable message code carried by the final History entry of a failed job.
    pub fn code(&self) -> &'static str {
        match self {
            PaasError::Reference(_) => "paas.error.reference",
            PaasError::Config(_) => "paas.error.configuration",
            PaasError::Manifest(_) | PaasError::Yaml(_) => "paas.error.manifest",
            PaasError::Variable(_) => "paas.error.variable",
            PaasError::Clone(_) => "paas.error.repository.clone",
            PaasError::Build(_) => "paas.error.build",
            PaasError::Hook { .. } => "paas.error.hook",
            PaasError::Driver { .. } | PaasError::Kube(_) => "paas.error.cluster",
            PaasError::Workspace(_) | PaasError::Io(_) => "paas.error.workspace",
            PaasError::Timeout(_) => "paas.error.timeout",
            PaasError::Cancelled => "paas.error.cancelled",
            PaasError::Contract(_) => "paas.error.contract",
            PaasError::Json(_) => "paas.error.job.payload",
            PaasError::Toml(_) => "paas.error.configuration",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            PaasError::Reference(_)
            | PaasError::Config(_)
            | PaasError::Manifest(_)
            | PaasError::Variable(_)
            | PaasError::Yaml(_)
            | PaasError::Json(_)
            | PaasError::Toml(_) => 400,
            PaasError::Timeout(_) => 408,
            PaasError::Cancelled => 499,
            _ => 500,
        }
    }

    pub fn is_user_error(&self) -> bool {
        self.http_status() < 500
    }
}
