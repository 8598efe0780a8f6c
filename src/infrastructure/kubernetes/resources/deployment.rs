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

use crate::domain::deployment::{CompiledDeployment, Container, EnvValue, Pod, Volume};
use crate::infrastructure::constants::*;
use crate::infrastructure::kubernetes::resources::secret::secret_name;
use crate::infrastructure::kubernetes::resources::volume::claim_name;
use crate::infrastructure::kubernetes::resources::{kube_name, ResourceContext};
use crate::shared::error::{PaasError, Result};
use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    self, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, SecretKeySelector,
    SecretVolumeSource, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub fn deployment_name(pod: &str) -> String {
    format!("{}{}", kube_name(pod), SUFFIX_DEPLOYMENT)
}

/// Builds the Deployment running one compiled pod.
///
/// Content volumes embedded in an image need nothing here. Imported volumes
/// become an `emptyDir` filled by an init container running the volume's
/// image.
pub struct DeploymentBuilder<'a> {
    context: &'a ResourceContext,
    deployment: &'a CompiledDeployment,
    pod: &'a Pod,
}

impl<'a> DeploymentBuilder<'a> {
    pub fn new(
        context: &'a ResourceContext,
        deployment: &'a CompiledDeployment,
        pod: &'a Pod,
    ) -> Self {
        Self {
            context,
            deployment,
            pod,
        }
    }

    pub fn build(&self) -> Result<Deployment> {
        let mut volumes: BTreeMap<String, v1::Volume> = BTreeMap::new();
        let mut init_containers: BTreeMap<String, v1::Container> = BTreeMap::new();
        let mut containers = Vec::with_capacity(self.pod.containers.len());

        for container in &self.pod.containers {
            let mounts = self.mounts(container, &mut volumes, &mut init_containers)?;
            containers.push(v1::Container {
                name: kube_name(&container.name),
                image: Some(self.deployment.resolve_image(container)?),
                ports: Some(
                    container
                        .listen
                        .iter()
                        .map(|port| ContainerPort {
                            container_port: *port as i32,
                            ..Default::default()
                        })
                        .collect(),
                ),
                env: Some(self.env(container)),
                volume_mounts: Some(mounts),
                ..Default::default()
            });
        }

        let labels = self.get_labels();
        let metadata = self.context.metadata(deployment_name(&self.pod.name));

        Ok(Deployment {
            metadata: ObjectMeta {
                labels: Some(labels.clone()),
                ..metadata
            },
            spec: Some(DeploymentSpec {
                replicas: Some(self.pod.replicas as i32),
                selector: LabelSelector {
                    match_labels: Some(self.get_selector_labels()),
                    ..Default::default()
                },
                strategy: Some(DeploymentStrategy {
                    type_: Some(STRATEGY_TYPE_ROLLING_UPDATE.to_string()),
                    rolling_update: Some(RollingUpdateDeployment {
                        max_unavailable: Some(IntOrString::String(MAX_UNAVAILABLE.to_string())),
                        max_surge: Some(IntOrString::String(MAX_SURGE.to_string())),
                    }),
                }),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers,
                        init_containers: if init_containers.is_empty() {
                            None
                        } else {
                            Some(init_containers.into_values().collect())
                        },
                        volumes: if volumes.is_empty() {
                            None
                        } else {
                            Some(volumes.into_values().collect())
                        },
                        restart_policy: Some(RESTART_POLICY_ALWAYS.to_string()),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn get_selector_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_APP.to_string(), kube_name(&self.pod.name));
        labels
    }

    fn get_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.context.labels();
        labels.extend(self.get_selector_labels());
        labels
    }

    fn env(&self, container: &Container) -> Vec<EnvVar> {
        container
            .variables
            .iter()
            .map(|(name, value)| match value {
                EnvValue::Plain(value) => EnvVar {
                    name: name.clone(),
                    value: Some(value.clone()),
                    ..Default::default()
                },
                EnvValue::Secret(reference) => EnvVar {
                    name: name.clone(),
                    value_from: Some(EnvVarSource {
                        secret_key_ref: Some(SecretKeySelector {
                            name: secret_name(&reference.secret),
                            key: reference.key.clone(),
                            optional: None,
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            })
            .collect()
    }

    fn mounts(
        &self,
        container: &Container,
        volumes: &mut BTreeMap<String, v1::Volume>,
        init_containers: &mut BTreeMap<String, v1::Container>,
    ) -> Result<Vec<VolumeMount>> {
        let mut mounts = Vec::new();

        for volume in container.volumes.values() {
            let name = kube_name(volume.name());
            let pod_volume = match volume {
                Volume::Content(_) => continue,
                Volume::Persistent(persistent) => v1::Volume {
                    name: name.clone(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: claim_name(&persistent.name),
                        read_only: None,
                    }),
                    ..Default::default()
                },
                Volume::Secret(secret) => v1::Volume {
                    name: name.clone(),
                    secret: Some(SecretVolumeSource {
                        secret_name: Some(secret_name(&secret.secret)),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Volume::Imported(imported) => {
                    let source = self.deployment.resolve_import(imported)?;
                    let image = source.image.clone().ok_or_else(|| {
                        PaasError::reference(format!(
                            "volume '{}' imported by container '{}' has no built image",
                            source.name, container.name
                        ))
                    })?;

                    init_containers
                        .entry(name.clone())
                        .or_insert_with(|| v1::Container {
                            name: format!("{}{}", IMPORT_INIT_PREFIX, name),
                            image: Some(image),
                            command: Some(vec![
                                "sh".to_string(),
                                "-c".to_string(),
                                format!(
                                    "cp -a {}/. {}/",
                                    source.local_path.trim_end_matches('/'),
                                    IMPORT_STAGING_PATH
                                ),
                            ]),
                            volume_mounts: Some(vec![VolumeMount {
                                name: name.clone(),
                                mount_path: IMPORT_STAGING_PATH.to_string(),
                                ..Default::default()
                            }]),
                            ..Default::default()
                        });

                    v1::Volume {
                        name: name.clone(),
                        empty_dir: Some(EmptyDirVolumeSource::default()),
                        ..Default::default()
                    }
                }
            };

            volumes.entry(name.clone()).or_insert(pod_volume);
            mounts.push(VolumeMount {
                name,
                mount_path: volume.mount_path().to_string(),
                read_only: matches!(volume, Volume::Secret(_)).then_some(true),
                ..Default::default()
            });
        }

        Ok(mounts)
    }
}
