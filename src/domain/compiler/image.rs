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
    checkout_relative, entries, opt_scalar, scalar_to_string, CompileContext, SectionCompiler,
};
use crate::domain::deployment::{Buildable, CompiledDeployment, Image, ImagePath};
use crate::shared::error::{PaasError, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_TAG: &str = "latest";

/// An `images` entry, as written in a manifest or in the engine's image
/// library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImageDefinition {
    #[serde(default)]
    pub build_name: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub tag: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

impl ImageDefinition {
    /// Fields set by `self` win; the library fills whatever was left out.
    pub fn merged_over(self, library: &ImageDefinition) -> ImageDefinition {
        let mut variables = library.variables.clone();
        variables.extend(self.variables);
        ImageDefinition {
            build_name: self.build_name.or_else(|| library.build_name.clone()),
            tag: self.tag.or_else(|| library.tag.clone()),
            path: self.path.or_else(|| library.path.clone()),
            variables,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageCompiler {
    library: BTreeMap<String, ImageDefinition>,
}

impl ImageCompiler {
    pub fn new(library: BTreeMap<String, ImageDefinition>) -> Self {
        Self { library }
    }

    /// `library_path` is true only when the build context comes from the
    /// library itself; paths written in a manifest stay inside the checkout.
    fn build(
        &self,
        key: &str,
        definition: ImageDefinition,
        library: bool,
        library_path: bool,
    ) -> Result<Image> {
        let name = definition.build_name.unwrap_or_else(|| key.to_string());
        let path = definition.path.ok_or_else(|| {
            PaasError::reference(format!("image '{}' has no path", key))
        })?;

        let path = if library_path {
            ImagePath::Library(PathBuf::from(path))
        } else {
            ImagePath::Workspace(checkout_relative(&path, &format!("image '{}'", key))?)
        };

        let mut variables = BTreeMap::new();
        for (variable, value) in definition.variables {
            let value = scalar_to_string(&value).ok_or_else(|| {
                PaasError::Manifest(format!(
                    "variable '{}' of image '{}' must be a scalar",
                    variable, key
                ))
            })?;
            variables.insert(variable, value);
        }

        Ok(Image {
            name,
            tag: definition.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
            path,
            library,
            variables,
            registry: None,
        })
    }
}

impl SectionCompiler for ImageCompiler {
    fn section(&self) -> &'static str {
        "images"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        _context: &CompileContext<'_>,
    ) -> Result<()> {
        let mut resolved: BTreeMap<String, (ImageDefinition, bool, bool)> = self
            .library
            .iter()
            .map(|(key, definition)| (key.clone(), (definition.clone(), true, true)))
            .collect();

        for (key, definition) in entries::<ImageDefinition>(section, "image")? {
            match self.library.get(&key) {
                Some(library) => {
                    let library_path = definition.path.is_none();
                    resolved.insert(key, (definition.merged_over(library), true, library_path));
                }
                None => {
                    resolved.insert(key, (definition, false, false));
                }
            }
        }

        for (key, (definition, library, library_path)) in resolved {
            let image = self.build(&key, definition, library, library_path)?;
            debug!(image = %image.name, library, "compiled image");
            deployment.add_buildable(Buildable::Image(image))?;
        }

        Ok(())
    }
}
