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

//! The immutable deployment request and its wire format.
//!
//! Polymorphic members (source repository, images repository, identities,
//! cluster drivers) are closed enums discriminated by a `type` field.

use crate::domain::job::history::History;
use crate::domain::job::variables::substitute_variables;
use crate::shared::error::{PaasError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Identity {
    /// Private key used to pull a source repository over SSH.
    Ssh { name: String, private_key: String },
    /// Credentials of an OCI registry.
    Registry {
        name: String,
        username: String,
        password: String,
        #[serde(default)]
        email: Option<String>,
    },
    /// Credentials of a cluster API. Certificate fields carry base64 data,
    /// in the same encoding as a kubeconfig file.
    Cluster {
        name: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        certificate_authority_data: Option<String>,
        #[serde(default)]
        client_certificate_data: Option<String>,
        #[serde(default)]
        client_key_data: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },
}

impl Identity {
    pub fn name(&self) -> &str {
        match self {
            Identity::Ssh { name, .. }
            | Identity::Registry { name, .. }
            | Identity::Cluster { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceRepository {
    Git {
        pull_url: String,
        #[serde(default = "default_branch")]
        default_branch: String,
        #[serde(default)]
        identity: Option<Identity>,
    },
}

fn default_branch() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImagesRepository {
    Registry {
        api_url: String,
        #[serde(default)]
        identity: Option<Identity>,
    },
}

impl ImagesRepository {
    pub fn api_url(&self) -> &str {
        match self {
            ImagesRepository::Registry { api_url, .. } => api_url,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ImagesRepository::Registry { identity, .. } => identity.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    Kubernetes,
}

impl ClusterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterKind::Kubernetes => "kubernetes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ClusterKind,
    pub address: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub identity: Option<Identity>,
    pub environment: Environment,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// One deployment request. Never mutated in place: recording an event
/// produces a new unit carrying the extended history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUnit {
    id: String,
    project: ProjectRef,
    environment: Environment,
    source_repository: SourceRepository,
    images_repository: ImagesRepository,
    #[serde(default)]
    clusters: Vec<ClusterDefinition>,
    #[serde(default)]
    history: Option<History>,
    #[serde(default)]
    extra: Map<String, Value>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

impl JobUnit {
    pub fn new(
        id: impl Into<String>,
        project: ProjectRef,
        environment: Environment,
        source_repository: SourceRepository,
        images_repository: ImagesRepository,
        clusters: Vec<ClusterDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            project,
            environment,
            source_repository,
            images_repository,
            clusters,
            history: None,
            extra: Map::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        let job: JobUnit = serde_json::from_str(payload)?;
        job.validate()?;
        Ok(job)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(PaasError::config_error("job id must not be empty"));
        }
        if self.project.id.trim().is_empty() {
            return Err(PaasError::config_error("project id must not be empty"));
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn source_repository(&self) -> &SourceRepository {
        &self.source_repository
    }

    pub fn images_repository(&self) -> &ImagesRepository {
        &self.images_repository
    }

    pub fn clusters(&self) -> &[ClusterDefinition] {
        &self.clusters
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Returns a copy of this unit whose history head is a new event chained
    /// to the current head.
    pub fn record(
        &self,
        message: impl Into<String>,
        date: DateTime<Utc>,
        is_final: bool,
        extra: Map<String, Value>,
    ) -> JobUnit {
        let mut event = History::new(message, date)
            .with_extra(extra)
            .chained_to(self.history.as_ref());
        event.is_final = is_final;

        let mut next = self.clone();
        next.history = Some(event);
        next
    }

    /// Substitutes `${NAME}` placeholders with this job's variables in every
    /// string scalar of a parsed manifest.
    pub fn update_variables_in(&self, tree: serde_yaml::Value) -> Result<serde_yaml::Value> {
        substitute_variables(tree, &self.variables)
    }
}
