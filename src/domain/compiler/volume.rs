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

use crate::domain::compiler::{checkout_relative, entries, CompileContext, SectionCompiler};
use crate::domain::deployment::{CompiledDeployment, ContentVolume, Volume};
use crate::shared::error::{PaasError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VolumeDefinition {
    #[serde(default)]
    local_path: Option<String>,
    #[serde(default)]
    mount_path: Option<String>,
    #[serde(default)]
    add: Option<Vec<String>>,
}

/// Compiles top-level `volumes`. Each one is a content volume whose files
/// come from the checkout.
#[derive(Debug, Clone, Default)]
pub struct VolumeCompiler;

impl VolumeCompiler {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn content_paths(add: &[String], owner: &str) -> Result<Vec<std::path::PathBuf>> {
    add.iter()
        .map(|path| checkout_relative(path, owner))
        .collect()
}

impl SectionCompiler for VolumeCompiler {
    fn section(&self) -> &'static str {
        "volumes"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        _context: &CompileContext<'_>,
    ) -> Result<()> {
        for (name, definition) in entries::<VolumeDefinition>(section, "volume")? {
            let owner = format!("volume '{}'", name);
            let add = definition
                .add
                .ok_or_else(|| PaasError::reference(format!("{} has no 'add' entry", owner)))?;

            let volume = ContentVolume {
                local_path: definition
                    .local_path
                    .unwrap_or_else(|| format!("/volumes/{}", name)),
                mount_path: definition
                    .mount_path
                    .unwrap_or_else(|| format!("/mnt/{}", name)),
                paths: content_paths(&add, &owner)?,
                image: None,
                name,
            };
            debug!(volume = %volume.name, paths = volume.paths.len(), "compiled volume");
            deployment.add_volume(Volume::Content(volume))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compiler::test_support::{context, job, section};
    use std::path::PathBuf;

    #[test]
    fn test_default_paths() {
        let job = job();
        let mut deployment = CompiledDeployment::new("v1", "Job-7");
        VolumeCompiler::new()
            .compile(&section("assets:\n  add: [public, /build/css]\n"), &mut deployment, &context(&job))
            .unwrap();

        match deployment.volume("assets") {
            Some(Volume::Content(content)) => {
                assert_eq!(content.local_path, "/volumes/assets");
                assert_eq!(content.mount_path, "/mnt/assets");
                assert_eq!(
                    content.paths,
                    vec![PathBuf::from("public"), PathBuf::from("build/css")]
                );
                assert!(content.image.is_none());
            }
            other => panic!("unexpected volume {:?}", other),
        }
    }

    #[test]
    fn test_add_is_required_and_confined() {
        let job = job();
        let compiler = VolumeCompiler::new();

        let mut deployment = CompiledDeployment::new("v1", "Job-7");
        let missing = compiler.compile(&section("assets:\n  mount-path: /a\n"), &mut deployment, &context(&job));
        assert!(matches!(missing, Err(PaasError::Reference(_))));

        let mut deployment = CompiledDeployment::new("v1", "Job-7");
        let escaping = compiler.compile(&section("assets:\n  add: [../../etc]\n"), &mut deployment, &context(&job));
        assert!(matches!(escaping, Err(PaasError::Reference(_))));
    }
}
