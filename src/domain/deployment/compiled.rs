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

use crate::domain::deployment::model::{
    Buildable, Container, ContentVolume, ImportedVolume, Ingress, Pod, Secret, Service, Volume,
};
use crate::domain::hook::HookStep;
use crate::shared::error::{PaasError, Result};
use std::collections::BTreeMap;

/// The validated result of compiling one manifest for one job.
///
/// Entities are keyed by name. Pods only reference images by name, so
/// replacing a buildable with [`CompiledDeployment::update_buildable`] is seen
/// by every container that uses it.
#[derive(Debug, Default, PartialEq)]
pub struct CompiledDeployment {
    version: String,
    job_id: String,
    buildables: BTreeMap<String, Buildable>,
    volumes: BTreeMap<String, Volume>,
    pods: BTreeMap<String, Pod>,
    services: BTreeMap<String, Service>,
    secrets: BTreeMap<String, Secret>,
    ingresses: BTreeMap<String, Ingress>,
    hooks: Vec<HookStep>,
}

impl CompiledDeployment {
    pub fn new(version: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn add_buildable(&mut self, buildable: Buildable) -> Result<()> {
        if self.buildables.contains_key(buildable.name()) {
            return Err(PaasError::reference(format!(
                "image '{}' is declared more than once",
                buildable.name()
            )));
        }
        self.buildables
            .insert(buildable.name().to_string(), buildable);
        Ok(())
    }

    /// Replaces a declared buildable, e.g. once it has been pushed to its
    /// registry.
    pub fn update_buildable(&mut self, buildable: Buildable) -> Result<()> {
        match self.buildables.get_mut(buildable.name()) {
            Some(slot) => {
                *slot = buildable;
                Ok(())
            }
            None => Err(PaasError::reference(format!(
                "cannot update undeclared image '{}'",
                buildable.name()
            ))),
        }
    }

    pub fn buildable(&self, name: &str) -> Option<&Buildable> {
        self.buildables.get(name)
    }

    /// Buildables used by at least one container. Declared but unused images
    /// are kept but never yielded here, so they are never built.
    pub fn buildables(&self) -> impl Iterator<Item = &Buildable> + '_ {
        self.buildables
            .values()
            .filter(move |buildable| self.is_referenced(buildable.name()))
    }

    pub fn declared_buildables(&self) -> impl Iterator<Item = &Buildable> + '_ {
        self.buildables.values()
    }

    /// Used by a container directly, or as the base of an embedded volume
    /// image that a container uses.
    fn is_referenced(&self, image: &str) -> bool {
        self.containers().any(|(_, container)| {
            container.image == image
                || matches!(
                    self.buildables.get(&container.image),
                    Some(Buildable::EmbeddedVolume(embedded)) if embedded.original == image
                )
        })
    }

    /// Full image reference a container runs, following late-bound registries.
    pub fn resolve_image(&self, container: &Container) -> Result<String> {
        if let Some(buildable) = self.buildables.get(&container.image) {
            return Ok(buildable.reference());
        }
        if container.is_external_image() {
            return Ok(format!("{}:{}", container.image, container.version));
        }
        Err(PaasError::reference(format!(
            "container '{}' uses undeclared image '{}'",
            container.name, container.image
        )))
    }

    pub fn add_volume(&mut self, volume: Volume) -> Result<()> {
        if self.volumes.contains_key(volume.name()) {
            return Err(PaasError::reference(format!(
                "volume '{}' is declared more than once",
                volume.name()
            )));
        }
        self.volumes.insert(volume.name().to_string(), volume);
        Ok(())
    }

    pub fn update_volume(&mut self, volume: Volume) -> Result<()> {
        match self.volumes.get_mut(volume.name()) {
            Some(slot) => {
                *slot = volume;
                Ok(())
            }
            None => Err(PaasError::reference(format!(
                "cannot update undeclared volume '{}'",
                volume.name()
            ))),
        }
    }

    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.get(name)
    }

    pub fn volumes(&self) -> impl Iterator<Item = &Volume> + '_ {
        self.volumes.values()
    }

    /// Top-level content volumes imported by at least one container.
    pub fn imported_volumes(&self) -> impl Iterator<Item = &ContentVolume> + '_ {
        self.volumes.values().filter_map(move |volume| match volume {
            Volume::Content(content) if self.is_imported(&content.name) => Some(content),
            _ => None,
        })
    }

    fn is_imported(&self, name: &str) -> bool {
        self.containers().any(|(_, container)| {
            container
                .volumes
                .values()
                .any(|v| matches!(v, Volume::Imported(imported) if imported.from == name))
        })
    }

    pub fn resolve_import(&self, imported: &ImportedVolume) -> Result<&ContentVolume> {
        match self.volumes.get(&imported.from) {
            Some(Volume::Content(content)) => Ok(content),
            Some(_) => Err(PaasError::reference(format!(
                "volume '{}' cannot be imported, it has no content",
                imported.from
            ))),
            None => Err(PaasError::reference(format!(
                "volume '{}' imports undeclared volume '{}'",
                imported.name, imported.from
            ))),
        }
    }

    /// Adds a pod after checking every container image resolves to a declared
    /// buildable or to an externally hosted image.
    pub fn add_pod(&mut self, pod: Pod) -> Result<()> {
        if self.pods.contains_key(&pod.name) {
            return Err(PaasError::reference(format!(
                "pod '{}' is declared more than once",
                pod.name
            )));
        }

        for container in &pod.containers {
            if !container.is_external_image() && !self.buildables.contains_key(&container.image) {
                return Err(PaasError::reference(format!(
                    "image '{}' of container '{}' in pod '{}' is not declared",
                    container.image, container.name, pod.name
                )));
            }
        }

        self.pods.insert(pod.name.clone(), pod);
        Ok(())
    }

    pub fn pod(&self, name: &str) -> Option<&Pod> {
        self.pods.get(name)
    }

    pub fn pods(&self) -> impl Iterator<Item = &Pod> + '_ {
        self.pods.values()
    }

    pub fn containers(&self) -> impl Iterator<Item = (&Pod, &Container)> + '_ {
        self.pods
            .values()
            .flat_map(|pod| pod.containers.iter().map(move |c| (pod, c)))
    }

    pub fn add_service(&mut self, service: Service) -> Result<()> {
        if self.services.contains_key(&service.name) {
            return Err(PaasError::reference(format!(
                "service '{}' is declared more than once",
                service.name
            )));
        }
        self.services.insert(service.name.clone(), service);
        Ok(())
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> + '_ {
        self.services.values()
    }

    pub fn add_secret(&mut self, secret: Secret) -> Result<()> {
        if self.secrets.contains_key(&secret.name) {
            return Err(PaasError::reference(format!(
                "secret '{}' is declared more than once",
                secret.name
            )));
        }
        self.secrets.insert(secret.name.clone(), secret);
        Ok(())
    }

    pub fn secret(&self, name: &str) -> Option<&Secret> {
        self.secrets.get(name)
    }

    pub fn secrets(&self) -> impl Iterator<Item = &Secret> + '_ {
        self.secrets.values()
    }

    pub fn add_ingress(&mut self, ingress: Ingress) -> Result<()> {
        if self.ingresses.contains_key(&ingress.name) {
            return Err(PaasError::reference(format!(
                "ingress '{}' is declared more than once",
                ingress.name
            )));
        }
        self.ingresses.insert(ingress.name.clone(), ingress);
        Ok(())
    }

    pub fn ingresses(&self) -> impl Iterator<Item = &Ingress> + '_ {
        self.ingresses.values()
    }

    pub fn add_hook(&mut self, hook: HookStep) -> Result<()> {
        if self.hooks.iter().any(|h| h.name == hook.name) {
            return Err(PaasError::reference(format!(
                "hook '{}' is declared more than once",
                hook.name
            )));
        }
        self.hooks.push(hook);
        Ok(())
    }

    /// Hooks in manifest order.
    pub fn hooks(&self) -> &[HookStep] {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut [HookStep] {
        &mut self.hooks
    }
}
