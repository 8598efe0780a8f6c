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

//! Builds and pushes OCI images with a buildah compatible command line
//! (`buildah`, `podman` or `docker`).

use crate::domain::config::BuilderConf;
use crate::domain::deployment::{
    Buildable, CompiledDeployment, ContentVolume, EmbeddedVolumeImage, Image, Volume,
};
use crate::domain::job::Identity;
use crate::domain::pipeline::ImageBuilder;
use crate::infrastructure::process::run_command;
use crate::shared::error::{PaasError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

const CONTAINERFILES_DIR: &str = ".containerfiles";

#[derive(Debug, Clone)]
struct Registry {
    url: String,
    credentials: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OciImageBuilder {
    binary: String,
    timeout: Duration,
    volume_base_image: String,
    tls_verify: bool,
    registry: Option<Registry>,
}

impl OciImageBuilder {
    pub fn new(conf: &BuilderConf) -> Self {
        Self {
            binary: conf.binary.clone(),
            timeout: Duration::from_secs(conf.timeout),
            volume_base_image: conf.volume_base_image.clone(),
            tls_verify: conf.tls_verify,
            registry: None,
        }
    }

    fn registry(&self) -> Result<&Registry> {
        self.registry
            .as_ref()
            .ok_or_else(|| PaasError::contract("image builder is not configured"))
    }

    async fn build(&self, reference: &str, args: Vec<String>) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("build")
            .arg(format!("--tls-verify={}", self.tls_verify))
            .arg("--tag")
            .arg(reference)
            .args(args);
        run_command(&mut cmd, &format!("build {}", reference), self.timeout)
            .await
            .map_err(PaasError::Build)?;
        Ok(())
    }

    async fn push(&self, reference: &str) -> Result<()> {
        let registry = self.registry()?;
        let mut cmd = Command::new(&self.binary);
        cmd.arg("push").arg(format!("--tls-verify={}", self.tls_verify));
        if let Some(credentials) = &registry.credentials {
            cmd.arg("--creds").arg(credentials);
        }
        cmd.arg(reference);
        run_command(&mut cmd, &format!("push {}", reference), self.timeout)
            .await
            .map_err(PaasError::Build)?;
        Ok(())
    }

    async fn write_containerfile(&self, working_path: &Path, name: &str, content: &str) -> Result<PathBuf> {
        let directory = working_path
            .parent()
            .unwrap_or(working_path)
            .join(CONTAINERFILES_DIR);
        tokio::fs::create_dir_all(&directory).await?;
        let path = directory.join(format!("{}.Containerfile", name));
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    async fn build_image(&self, image: &Image, working_path: &Path) -> Result<Buildable> {
        let registry = self.registry()?;
        let bound = Buildable::Image(image.clone()).with_registry(&registry.url);
        let reference = bound.reference();

        let mut args = Vec::new();
        for (name, value) in &image.variables {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", name, value));
        }
        args.push(image.path.resolve(working_path).to_string_lossy().to_string());

        self.build(&reference, args).await?;
        self.push(&reference).await?;
        Ok(bound)
    }

    async fn build_embedded(
        &self,
        image: &EmbeddedVolumeImage,
        base: &str,
        working_path: &Path,
    ) -> Result<Buildable> {
        let registry = self.registry()?;
        let bound = Buildable::EmbeddedVolume(image.clone()).with_registry(&registry.url);
        let reference = bound.reference();

        let containerfile = containerfile(base, &image.volumes, |volume| volume.mount_path.as_str());
        let path = self
            .write_containerfile(working_path, &image.name, &containerfile)
            .await?;

        let args = vec![
            "--file".to_string(),
            path.to_string_lossy().to_string(),
            working_path.to_string_lossy().to_string(),
        ];
        self.build(&reference, args).await?;
        self.push(&reference).await?;
        Ok(bound)
    }
}

/// Writes a Containerfile copying every path of `volumes`, relative to the
/// build context, under the directory `target` picks for its volume.
pub fn containerfile<F>(base: &str, volumes: &[ContentVolume], target: F) -> String
where
    F: Fn(&ContentVolume) -> &str,
{
    let mut content = format!("FROM {}\n", base);
    for volume in volumes {
        let destination = format!("{}/", target(volume).trim_end_matches('/'));
        for path in &volume.paths {
            content.push_str(&format!("COPY {} {}\n", path.display(), destination));
        }
    }
    content
}

#[async_trait]
impl ImageBuilder for OciImageBuilder {
    fn configure(&mut self, project_id: &str, url: &str, auth: Option<&Identity>) -> Result<()> {
        let credentials = match auth {
            None => None,
            Some(Identity::Registry {
                username, password, ..
            }) => Some(format!("{}:{}", username, password)),
            Some(other) => {
                return Err(PaasError::config_error(format!(
                    "identity '{}' cannot authenticate an image registry",
                    other.name()
                )))
            }
        };

        self.registry = Some(Registry {
            url: format!("{}/{}", url.trim_end_matches('/'), project_id),
            credentials,
        });
        Ok(())
    }

    async fn build_images(
        &self,
        deployment: &mut CompiledDeployment,
        working_path: &Path,
    ) -> Result<()> {
        let buildables: Vec<Buildable> = deployment.buildables().cloned().collect();

        // Embedded volume images build on top of project images, so those go first.
        for buildable in &buildables {
            if let Buildable::Image(image) = buildable {
                info!(image = %image.name, "building image");
                let bound = self.build_image(image, working_path).await?;
                deployment.update_buildable(bound)?;
            }
        }

        for buildable in &buildables {
            if let Buildable::EmbeddedVolume(image) = buildable {
                let base = deployment
                    .buildable(&image.original)
                    .map(Buildable::reference)
                    .unwrap_or_else(|| image.original.clone());
                info!(image = %image.name, base = %base, "building embedded volume image");
                let bound = self.build_embedded(image, &base, working_path).await?;
                deployment.update_buildable(bound)?;
            }
        }

        Ok(())
    }

    async fn build_volumes(
        &self,
        deployment: &mut CompiledDeployment,
        working_path: &Path,
    ) -> Result<()> {
        let registry = self.registry()?.url.clone();
        let volumes: Vec<ContentVolume> = deployment.imported_volumes().cloned().collect();

        for volume in volumes {
            let reference = format!(
                "{}/{}-volume:{}",
                registry,
                volume.name,
                deployment.job_id()
            )
            .to_lowercase();

            let containerfile = containerfile(
                &self.volume_base_image,
                std::slice::from_ref(&volume),
                |v| v.local_path.as_str(),
            );
            let name = format!("{}-volume", volume.name);
            let path = self
                .write_containerfile(working_path, &name, &containerfile)
                .await?;

            info!(volume = %volume.name, image = %reference, "building volume image");
            let args = vec![
                "--file".to_string(),
                path.to_string_lossy().to_string(),
                working_path.to_string_lossy().to_string(),
            ];
            self.build(&reference, args).await?;
            self.push(&reference).await?;

            deployment.update_volume(Volume::Content(ContentVolume {
                image: Some(reference),
                ..volume
            }))?;
        }

        Ok(())
    }
}
