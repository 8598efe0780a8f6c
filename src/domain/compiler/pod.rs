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

use crate::domain::compiler::image::DEFAULT_TAG;
use crate::domain::compiler::volume::content_paths;
use crate::domain::compiler::{entries, opt_scalar, scalar_to_string, CompileContext, SectionCompiler};
use crate::domain::deployment::{
    Buildable, CompiledDeployment, Container, ContentVolume, EmbeddedVolumeImage, EnvValue,
    ImportedVolume, PersistentVolume, Pod, SecretReference, SecretVolume, Volume,
};
use crate::shared::error::{PaasError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;

const FROM_SECRETS: &str = "from-secrets";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PodDefinition {
    #[serde(default)]
    replicas: Option<u32>,
    #[serde(default)]
    containers: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ContainerDefinition {
    #[serde(default)]
    image: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    version: Option<String>,
    #[serde(default)]
    listen: Vec<u16>,
    #[serde(default)]
    volumes: Value,
    #[serde(default)]
    variables: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ContainerVolumeDefinition {
    #[serde(default)]
    mount_path: Option<String>,
    #[serde(default)]
    persistent: bool,
    #[serde(default)]
    storage_provider: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    storage_size: Option<String>,
    #[serde(default)]
    from_secret: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    add: Option<Vec<String>>,
}

/// Compiles `pods`: containers, their volumes and environment.
///
/// Containers declaring inline `add` volumes get an [`EmbeddedVolumeImage`]
/// built on top of their image, named after the pod, the container and the
/// job so that concurrent jobs never share it.
#[derive(Debug, Clone, Default)]
pub struct PodCompiler;

impl PodCompiler {
    pub fn new() -> Self {
        Self
    }

    fn container(
        &self,
        pod: &str,
        name: String,
        definition: ContainerDefinition,
        deployment: &mut CompiledDeployment,
        context: &CompileContext<'_>,
    ) -> Result<Container> {
        let image = definition.image.ok_or_else(|| {
            PaasError::reference(format!("container '{}' of pod '{}' has no image", name, pod))
        })?;
        let version = definition.version.unwrap_or_else(|| DEFAULT_TAG.to_string());

        let mut volumes = BTreeMap::new();
        let mut embeds = false;
        for (volume_name, volume_definition) in
            entries::<ContainerVolumeDefinition>(&definition.volumes, "container volume")?
        {
            let owner = format!("volume '{}' of container '{}'", volume_name, name);
            let volume = self.volume(volume_name.clone(), volume_definition, &owner, deployment, context)?;
            embeds |= matches!(volume, Volume::Content(_));
            volumes.insert(volume_name, volume);
        }

        let variables = self.variables(&definition.variables, &name)?;

        let mut container = Container {
            name,
            image,
            version,
            listen: definition.listen,
            volumes,
            variables,
        };

        if embeds {
            self.embed(pod, &mut container, deployment, context)?;
        }

        Ok(container)
    }

    fn volume(
        &self,
        name: String,
        definition: ContainerVolumeDefinition,
        owner: &str,
        deployment: &CompiledDeployment,
        context: &CompileContext<'_>,
    ) -> Result<Volume> {
        let kinds = [
            definition.persistent,
            definition.from_secret.is_some(),
            definition.from.is_some(),
            definition.add.is_some(),
        ];
        if kinds.iter().filter(|set| **set).count() > 1 {
            return Err(PaasError::Manifest(format!(
                "{} mixes 'persistent', 'from-secret', 'from' and 'add'",
                owner
            )));
        }

        if let Some(from) = definition.from {
            let imported = ImportedVolume {
                name,
                mount_path: String::new(),
                from,
            };
            let source = deployment.resolve_import(&imported)?;
            let mount_path = definition
                .mount_path
                .unwrap_or_else(|| source.mount_path.clone());
            return Ok(Volume::Imported(ImportedVolume {
                mount_path,
                ..imported
            }));
        }

        let mount_path = definition
            .mount_path
            .ok_or_else(|| PaasError::reference(format!("{} has no 'mount-path'", owner)))?;

        if definition.persistent {
            return Ok(Volume::Persistent(PersistentVolume {
                name,
                mount_path,
                storage_class: definition
                    .storage_provider
                    .or_else(|| context.default_storage_class.map(str::to_string)),
                storage_size: definition
                    .storage_size
                    .unwrap_or_else(|| context.default_storage_size.to_string()),
            }));
        }

        if let Some(secret) = definition.from_secret {
            return Ok(Volume::Secret(SecretVolume {
                name,
                mount_path,
                secret,
            }));
        }

        match definition.add {
            Some(add) => Ok(Volume::Content(ContentVolume {
                paths: content_paths(&add, owner)?,
                local_path: mount_path.clone(),
                mount_path,
                image: None,
                name,
            })),
            None => Err(PaasError::reference(format!(
                "{} must declare one of 'persistent', 'from-secret', 'from' or 'add'",
                owner
            ))),
        }
    }

    fn variables(&self, section: &Value, container: &str) -> Result<BTreeMap<String, EnvValue>> {
        let mut variables = BTreeMap::new();
        let mapping = match section {
            Value::Null => return Ok(variables),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(PaasError::Manifest(format!(
                    "variables of container '{}' must be a mapping",
                    container
                )))
            }
        };

        for (key, value) in mapping {
            let key = scalar_to_string(key).ok_or_else(|| {
                PaasError::Manifest(format!("container '{}' has a non scalar variable name", container))
            })?;

            if key == FROM_SECRETS {
                for (variable, reference) in entries::<String>(value, "secret variable")? {
                    let parsed = SecretReference::parse(&reference).ok_or_else(|| {
                        PaasError::reference(format!(
                            "variable '{}' of container '{}' must reference 'secret.key', got '{}'",
                            variable, container, reference
                        ))
                    })?;
                    variables.insert(variable, EnvValue::Secret(parsed));
                }
                continue;
            }

            let value = scalar_to_string(value).ok_or_else(|| {
                PaasError::Manifest(format!(
                    "variable '{}' of container '{}' must be a scalar",
                    key, container
                ))
            })?;
            variables.insert(key, EnvValue::Plain(value));
        }

        Ok(variables)
    }

    fn embed(
        &self,
        pod: &str,
        container: &mut Container,
        deployment: &mut CompiledDeployment,
        context: &CompileContext<'_>,
    ) -> Result<()> {
        let original = if container.is_external_image() {
            format!("{}:{}", container.image, container.version)
        } else if deployment.buildable(&container.image).is_some() {
            container.image.clone()
        } else {
            return Err(PaasError::reference(format!(
                "image '{}' of container '{}' in pod '{}' is not declared",
                container.image, container.name, pod
            )));
        };

        let base = container
            .image
            .rsplit('/')
            .next()
            .unwrap_or(container.image.as_str());
        let name = format!("{}-{}-{}-{}", base, pod, container.name, context.job.id()).to_lowercase();

        let mut volumes = Vec::new();
        for volume in container.volumes.values_mut() {
            if let Volume::Content(content) = volume {
                content.image = Some(name.clone());
                volumes.push(content.clone());
            }
        }

        debug!(image = %name, original = %original, "synthesized embedded volume image");
        deployment.add_buildable(Buildable::EmbeddedVolume(EmbeddedVolumeImage {
            name: name.clone(),
            tag: container.version.clone(),
            original,
            volumes,
            registry: None,
        }))?;

        container.image = name;
        Ok(())
    }
}

impl SectionCompiler for PodCompiler {
    fn section(&self) -> &'static str {
        "pods"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        context: &CompileContext<'_>,
    ) -> Result<()> {
        for (pod_name, definition) in entries::<PodDefinition>(section, "pod")? {
            let mut containers = Vec::new();
            for (name, container) in entries::<ContainerDefinition>(&definition.containers, "container")? {
                containers.push(self.container(&pod_name, name, container, deployment, context)?);
            }

            if containers.is_empty() {
                return Err(PaasError::reference(format!(
                    "pod '{}' has no container",
                    pod_name
                )));
            }

            let pod = Pod {
                replicas: definition.replicas.unwrap_or(1),
                name: pod_name,
                containers,
            };
            debug!(pod = %pod.name, replicas = pod.replicas, "compiled pod");
            deployment.add_pod(pod)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compiler::test_support::{context, job, section};
    use crate::domain::deployment::{Image, ImagePath};
    use std::path::PathBuf;

    fn with_image_and_volume() -> CompiledDeployment {
        let mut deployment = CompiledDeployment::new("v1", "Job-7");
        deployment
            .add_buildable(Buildable::Image(Image {
                name: "php".to_string(),
                tag: "8.3".to_string(),
                path: ImagePath::Workspace(PathBuf::from("docker/php")),
                library: false,
                variables: BTreeMap::new(),
                registry: None,
            }))
            .unwrap();
        deployment
            .add_volume(Volume::Content(ContentVolume {
                name: "assets".to_string(),
                mount_path: "/mnt/assets".to_string(),
                local_path: "/volumes/assets".to_string(),
                paths: vec![PathBuf::from("public")],
                image: None,
            }))
            .unwrap();
        deployment
    }

    fn compile(yaml: &str) -> Result<CompiledDeployment> {
        let job = job();
        let mut deployment = with_image_and_volume();
        PodCompiler::new().compile(&section(yaml), &mut deployment, &context(&job))?;
        Ok(deployment)
    }

    #[test]
    fn test_inline_content_is_embedded() {
        let deployment = compile(
            "app:\n  containers:\n    fpm:\n      image: php\n      version: \"2\"\n      volumes:\n        config:\n          mount-path: /etc/php\n          add: [docker/php/conf.d]\n",
        )
        .unwrap();

        let container = &deployment.pod("app").unwrap().containers[0];
        assert_eq!(container.image, "php-app-fpm-job-7");
        match container.volumes.get("config") {
            Some(Volume::Content(content)) => {
                assert_eq!(content.image.as_deref(), Some("php-app-fpm-job-7"));
                assert_eq!(content.local_path, "/etc/php");
            }
            other => panic!("unexpected volume {:?}", other),
        }

        match deployment.buildable("php-app-fpm-job-7") {
            Some(Buildable::EmbeddedVolume(embedded)) => {
                assert_eq!(embedded.original, "php");
                assert_eq!(embedded.tag, "2");
                assert_eq!(embedded.volumes.len(), 1);
            }
            other => panic!("unexpected buildable {:?}", other),
        }

        let built: Vec<&str> = deployment.buildables().map(Buildable::name).collect();
        assert_eq!(built, vec!["php", "php-app-fpm-job-7"]);
    }

    #[test]
    fn test_external_image_is_embedded_with_its_version() {
        let deployment = compile(
            "web:\n  containers:\n    nginx:\n      image: docker.io/library/nginx\n      version: \"1.27\"\n      volumes:\n        conf:\n          mount-path: /etc/nginx/conf.d\n          add: [nginx]\n",
        )
        .unwrap();

        match deployment.buildable("nginx-web-nginx-job-7") {
            Some(Buildable::EmbeddedVolume(embedded)) => {
                assert_eq!(embedded.original, "docker.io/library/nginx:1.27");
            }
            other => panic!("unexpected buildable {:?}", other),
        }
    }

    #[test]
    fn test_volume_kinds_and_defaults() {
        let deployment = compile(
            "app:\n  replicas: 3\n  containers:\n    fpm:\n      image: php\n      volumes:\n        assets:\n          from: assets\n        data:\n          mount-path: /data\n          persistent: true\n        certs:\n          mount-path: /certs\n          from-secret: tls\n      variables:\n        MODE: prod\n        from-secrets:\n          TOKEN: api.token\n",
        )
        .unwrap();

        let pod = deployment.pod("app").unwrap();
        assert_eq!(pod.replicas, 3);
        let container = &pod.containers[0];
        assert_eq!(container.version, "latest");
        match container.volumes.get("assets") {
            Some(Volume::Imported(imported)) => {
                assert_eq!(imported.from, "assets");
                assert_eq!(imported.mount_path, "/mnt/assets");
            }
            other => panic!("unexpected volume {:?}", other),
        }
        match container.volumes.get("data") {
            Some(Volume::Persistent(persistent)) => {
                assert_eq!(persistent.storage_class.as_deref(), Some("standard"));
                assert_eq!(persistent.storage_size, "1Gi");
            }
            other => panic!("unexpected volume {:?}", other),
        }
        assert!(matches!(container.volumes.get("certs"), Some(Volume::Secret(s)) if s.secret == "tls"));
        assert_eq!(
            container.variables.get("TOKEN"),
            Some(&EnvValue::Secret(SecretReference::parse("api.token").unwrap()))
        );
        assert_eq!(
            container.variables.get("MODE"),
            Some(&EnvValue::Plain("prod".to_string()))
        );
    }

    #[test]
    fn test_volume_kinds_are_exclusive() {
        let result = compile(
            "app:\n  containers:\n    fpm:\n      image: php\n      volumes:\n        data:\n          mount-path: /data\n          persistent: true\n          from-secret: tls\n",
        );
        assert!(matches!(result, Err(PaasError::Manifest(_))));
    }

    #[test]
    fn test_reference_errors() {
        let no_mount = compile(
            "app:\n  containers:\n    fpm:\n      image: php\n      volumes:\n        data:\n          persistent: true\n",
        );
        assert!(matches!(no_mount, Err(PaasError::Reference(_))));

        let bad_secret = compile(
            "app:\n  containers:\n    fpm:\n      image: php\n      variables:\n        from-secrets:\n          TOKEN: token\n",
        );
        assert!(matches!(bad_secret, Err(PaasError::Reference(_))));

        let no_container = compile("app:\n  replicas: 2\n");
        assert!(matches!(no_container, Err(PaasError::Reference(_))));
    }
}
