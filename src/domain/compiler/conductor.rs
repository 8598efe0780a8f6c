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

use crate::domain::compiler::{
    scalar_to_string, CompileContext, HookCompiler, ImageCompiler, ImageDefinition,
    IngressCompiler, PodCompiler, SecretCompiler, SectionCompiler, ServiceCompiler,
    VolumeCompiler,
};
use crate::domain::config::CompilerConf;
use crate::domain::deployment::CompiledDeployment;
use crate::domain::hook::HookRegistry;
use crate::domain::job::JobUnit;
use crate::shared::error::{PaasError, Result};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The only manifest schema version this engine understands.
pub const SUPPORTED_VERSION: &str = "v1";

const VERSION_KEY: &str = "paas.version";

/// The section compilers, built once and shared by every job.
#[derive(Debug, Default)]
pub struct CompilerCollection {
    secrets: SecretCompiler,
    images: ImageCompiler,
    volumes: VolumeCompiler,
    pods: PodCompiler,
    services: ServiceCompiler,
    ingresses: IngressCompiler,
    hooks: HookCompiler,
    settings: CompilerConf,
}

impl CompilerCollection {
    pub fn new(
        library: BTreeMap<String, ImageDefinition>,
        registry: Arc<HookRegistry>,
        settings: CompilerConf,
    ) -> Self {
        Self {
            secrets: SecretCompiler::new(),
            images: ImageCompiler::new(library),
            volumes: VolumeCompiler::new(),
            pods: PodCompiler::new(),
            services: ServiceCompiler::new(),
            ingresses: IngressCompiler::new(),
            hooks: HookCompiler::new(registry),
            settings,
        }
    }

    /// Compilers in execution order. Pods come after images and volumes, and
    /// before services and ingresses, so every reference is checked against
    /// entities already compiled.
    pub fn ordered(&self) -> [&dyn SectionCompiler; 7] {
        [
            &self.secrets,
            &self.images,
            &self.volumes,
            &self.pods,
            &self.services,
            &self.ingresses,
            &self.hooks,
        ]
    }

    pub fn settings(&self) -> &CompilerConf {
        &self.settings
    }
}

/// Turns a job's manifest into a [`CompiledDeployment`].
///
/// A conductor is configured once per job, prepared with the raw manifest
/// and can then compile any number of times; every compilation starts from
/// an empty deployment, so the results are equal.
#[derive(Debug)]
pub struct Conductor {
    compilers: Arc<CompilerCollection>,
    job: Option<JobUnit>,
    manifest: Option<Value>,
}

impl Conductor {
    pub fn new(compilers: Arc<CompilerCollection>) -> Self {
        Self {
            compilers,
            job: None,
            manifest: None,
        }
    }

    pub fn configure(&mut self, job: JobUnit) {
        self.job = Some(job);
        self.manifest = None;
    }

    pub fn job(&self) -> Option<&JobUnit> {
        self.job.as_ref()
    }

    pub fn manifest(&self) -> Option<&Value> {
        self.manifest.as_ref()
    }

    /// Parses the manifest and substitutes the job variables into it.
    pub fn prepare(&mut self, raw: &str) -> Result<()> {
        let job = self.configured_job()?;

        let tree: Value = serde_yaml::from_str(raw)
            .map_err(|e| PaasError::Manifest(format!("cannot parse manifest: {}", e)))?;
        if !tree.is_mapping() {
            return Err(PaasError::Manifest(
                "manifest must be a mapping of sections".to_string(),
            ));
        }

        let tree = job.update_variables_in(tree)?;
        debug!(job_id = %job.id(), "manifest prepared");
        self.manifest = Some(tree);
        Ok(())
    }

    pub fn compile_deployment(&self) -> Result<CompiledDeployment> {
        let job = self.configured_job()?;
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| PaasError::contract("conductor has no prepared manifest"))?;

        let version = manifest_version(manifest)?;
        if version != SUPPORTED_VERSION {
            return Err(PaasError::config_error(format!(
                "manifest version '{}' is not supported, expected '{}'",
                version, SUPPORTED_VERSION
            )));
        }

        let settings = self.compilers.settings();
        let context = CompileContext {
            job,
            default_storage_class: settings.default_storage_class.as_deref(),
            default_storage_size: &settings.default_storage_size,
            default_ingress_provider: settings.default_ingress_provider.as_deref(),
        };

        let mut deployment = CompiledDeployment::new(version, job.id());
        // Absent sections still run so that library images are always declared.
        let absent = Value::Null;
        for compiler in self.compilers.ordered() {
            let section = manifest.get(compiler.section()).unwrap_or(&absent);
            compiler.compile(section, &mut deployment, &context)?;
        }

        info!(
            job_id = %job.id(),
            pods = deployment.pods().count(),
            buildables = deployment.buildables().count(),
            "deployment compiled"
        );
        Ok(deployment)
    }

    fn configured_job(&self) -> Result<&JobUnit> {
        self.job
            .as_ref()
            .ok_or_else(|| PaasError::contract("conductor is not configured with a job"))
    }
}

/// Reads `paas.version`, written either as a dotted key or as a nested
/// `paas: {version: ...}` mapping.
fn manifest_version(manifest: &Value) -> Result<String> {
    let version = manifest
        .get(VERSION_KEY)
        .or_else(|| manifest.get("paas").and_then(|paas| paas.get("version")));

    version
        .and_then(scalar_to_string)
        .ok_or_else(|| PaasError::config_error("manifest does not declare 'paas.version'"))
}
