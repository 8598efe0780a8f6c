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

//! Manifest compilers.
//!
//! Each [`SectionCompiler`] translates one top-level manifest section into
//! entities of a [`CompiledDeployment`]. Compilers are stateless once built
//! and may be shared between concurrent jobs; the [`Conductor`] runs them in
//! a fixed order.

pub mod conductor;
pub mod hook;
pub mod image;
pub mod ingress;
pub mod pod;
pub mod secret;
pub mod service;
pub mod volume;

pub use self::conductor::{CompilerCollection, Conductor, SUPPORTED_VERSION};
pub use self::hook::HookCompiler;
pub use self::image::{ImageCompiler, ImageDefinition};
pub use self::ingress::IngressCompiler;
pub use self::pod::PodCompiler;
pub use self::secret::SecretCompiler;
pub use self::service::ServiceCompiler;
pub use self::volume::VolumeCompiler;

use crate::domain::deployment::CompiledDeployment;
use crate::domain::job::JobUnit;
use crate::shared::error::{PaasError, Result};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::path::{Component, Path, PathBuf};

/// Job-wide values shared by every compiler of one compilation.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    pub job: &'a JobUnit,
    pub default_storage_class: Option<&'a str>,
    pub default_storage_size: &'a str,
    pub default_ingress_provider: Option<&'a str>,
}

pub trait SectionCompiler: Send + Sync {
    /// Top-level manifest key this compiler consumes.
    fn section(&self) -> &'static str;

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        context: &CompileContext<'_>,
    ) -> Result<()>;
}

/// Decodes every `name: definition` pair of a manifest mapping, keeping the
/// manifest order.
pub(crate) fn entries<T: DeserializeOwned>(section: &Value, what: &str) -> Result<Vec<(String, T)>> {
    let mapping = match section {
        Value::Null => return Ok(Vec::new()),
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(PaasError::Manifest(format!(
                "{} definitions must be a mapping of names",
                what
            )))
        }
    };

    let mut decoded = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = scalar_to_string(key).ok_or_else(|| {
            PaasError::Manifest(format!("{} names must be scalars, got {:?}", what, key))
        })?;
        let value = if value.is_null() {
            Value::Mapping(Default::default())
        } else {
            value.clone()
        };
        let definition = serde_yaml::from_value(value)
            .map_err(|e| PaasError::Manifest(format!("{} '{}': {}", what, name, e)))?;
        decoded.push((name, definition));
    }

    Ok(decoded)
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}

/// Accepts strings, numbers and booleans for fields such as `tag: 7.4`.
pub(crate) fn opt_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("expected a scalar value")),
    }
}

/// Normalizes a manifest path into a path relative to the checkout root.
pub(crate) fn checkout_relative(path: &str, owner: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PaasError::reference(format!(
                    "path '{}' of {} leaves the repository",
                    path, owner
                )))
            }
        }
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Ok(relative)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::deployment::{Container, Pod};
    use std::collections::BTreeMap;

    pub(crate) fn job() -> JobUnit {
        JobUnit::from_json(
            r#"{
                "id": "Job-7",
                "project": {"id": "shop", "name": "Shop"},
                "environment": {"name": "prod"},
                "source_repository": {"type": "git", "pull_url": "https://git.example.com/shop.git"},
                "images_repository": {"type": "registry", "api_url": "registry.example.com"}
            }"#,
        )
        .unwrap()
    }

    pub(crate) fn context(job: &JobUnit) -> CompileContext<'_> {
        CompileContext {
            job,
            default_storage_class: Some("standard"),
            default_storage_size: "1Gi",
            default_ingress_provider: Some("nginx"),
        }
    }

    pub(crate) fn section(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    /// A deployment holding one pod running an external nginx image.
    pub(crate) fn with_pod(name: &str, listen: Vec<u16>) -> CompiledDeployment {
        let mut deployment = CompiledDeployment::new("v1", "Job-7");
        deployment
            .add_pod(Pod {
                name: name.to_string(),
                replicas: 1,
                containers: vec![Container {
                    name: "main".to_string(),
                    image: "docker.io/library/nginx".to_string(),
                    version: "1.27".to_string(),
                    listen,
                    volumes: BTreeMap::new(),
                    variables: BTreeMap::new(),
                }],
            })
            .unwrap();
        deployment
    }
}
