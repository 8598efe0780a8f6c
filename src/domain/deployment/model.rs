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

//! Entities produced by the manifest compilers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the build context of an image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePath {
    /// Absolute path of a library image, known when the engine starts.
    Library(PathBuf),
    /// Path relative to the project checkout, resolved at build time.
    Workspace(PathBuf),
}

impl ImagePath {
    pub fn resolve(&self, working_path: &Path) -> PathBuf {
        match self {
            ImagePath::Library(path) => path.clone(),
            ImagePath::Workspace(relative) => working_path.join(relative),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    pub tag: String,
    pub path: ImagePath,
    pub library: bool,
    pub variables: BTreeMap<String, String>,
    pub registry: Option<String>,
}

/// An image synthesized from a container's base image plus the content
/// volumes the container declares inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedVolumeImage {
    pub name: String,
    pub tag: String,
    pub original: String,
    pub volumes: Vec<ContentVolume>,
    pub registry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buildable {
    Image(Image),
    EmbeddedVolume(EmbeddedVolumeImage),
}

impl Buildable {
    pub fn name(&self) -> &str {
        match self {
            Buildable::Image(image) => &image.name,
            Buildable::EmbeddedVolume(image) => &image.name,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Buildable::Image(image) => &image.tag,
            Buildable::EmbeddedVolume(image) => &image.tag,
        }
    }

    pub fn registry(&self) -> Option<&str> {
        match self {
            Buildable::Image(image) => image.registry.as_deref(),
            Buildable::EmbeddedVolume(image) => image.registry.as_deref(),
        }
    }

    /// Image name qualified with its registry once it has been late-bound.
    pub fn url(&self) -> String {
        match self.registry() {
            Some(registry) => format!("{}/{}", registry.trim_end_matches('/'), self.name()),
            None => self.name().to_string(),
        }
    }

    pub fn reference(&self) -> String {
        format!("{}:{}", self.url(), self.tag())
    }

    pub fn with_registry(&self, registry: impl Into<String>) -> Buildable {
        let registry = Some(registry.into());
        match self {
            Buildable::Image(image) => Buildable::Image(Image {
                registry,
                ..image.clone()
            }),
            Buildable::EmbeddedVolume(image) => Buildable::EmbeddedVolume(EmbeddedVolumeImage {
                registry,
                ..image.clone()
            }),
        }
    }
}

/// Files copied from the checkout, either embedded in an image or packaged in
/// a dedicated volume image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentVolume {
    pub name: String,
    pub mount_path: String,
    pub local_path: String,
    pub paths: Vec<PathBuf>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentVolume {
    pub name: String,
    pub mount_path: String,
    pub storage_class: Option<String>,
    pub storage_size: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretVolume {
    pub name: String,
    pub mount_path: String,
    pub secret: String,
}

/// A container-local view of a top-level volume, resolved by name when the
/// deployment is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedVolume {
    pub name: String,
    pub mount_path: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Volume {
    Content(ContentVolume),
    Persistent(PersistentVolume),
    Secret(SecretVolume),
    Imported(ImportedVolume),
}

impl Volume {
    pub fn name(&self) -> &str {
        match self {
            Volume::Content(v) => &v.name,
            Volume::Persistent(v) => &v.name,
            Volume::Secret(v) => &v.name,
            Volume::Imported(v) => &v.name,
        }
    }

    pub fn mount_path(&self) -> &str {
        match self {
            Volume::Content(v) => &v.mount_path,
            Volume::Persistent(v) => &v.mount_path,
            Volume::Secret(v) => &v.mount_path,
            Volume::Imported(v) => &v.mount_path,
        }
    }
}

/// Pointer to `secret.key`, resolved by the cluster driver at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub secret: String,
    pub key: String,
}

impl SecretReference {
    pub fn parse(reference: &str) -> Option<Self> {
        let (secret, key) = reference.split_once('.')?;
        if secret.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self {
            secret: secret.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.secret, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Plain(String),
    Secret(SecretReference),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub version: String,
    pub listen: Vec<u16>,
    pub volumes: BTreeMap<String, Volume>,
    pub variables: BTreeMap<String, EnvValue>,
}

impl Container {
    /// Images hosted outside the project are referenced with a registry path.
    pub fn is_external_image(&self) -> bool {
        self.image.contains('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    pub replicas: u32,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            _ => Err(format!("Invalid protocol: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transport {
    pub listen: u16,
    pub target: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub pod: String,
    pub ports: Vec<Transport>,
    pub protocol: Protocol,
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Secret {
    pub name: String,
    pub provider: String,
    pub options: BTreeMap<String, serde_yaml::Value>,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressBackend {
    pub service: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressPath {
    pub path: String,
    pub backend: IngressBackend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingress {
    pub name: String,
    pub host: String,
    pub aliases: Vec<String>,
    pub provider: Option<String>,
    pub default_backend: Option<IngressBackend>,
    pub paths: Vec<IngressPath>,
    pub tls_secret: Option<String>,
    pub meta: BTreeMap<String, String>,
}
