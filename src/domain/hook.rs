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

//! Build hooks: actions run inside the checkout before images are built.
//!
//! Hooks carry per-run state (working path, options), so a job never shares
//! an instance with another one. The registry hands out a fresh instance
//! from its factory every time a manifest asks for a hook.

use crate::shared::error::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait Hook: Send + Sync + fmt::Debug {
    fn set_path(&mut self, path: &Path);

    fn set_options(&mut self, options: &serde_yaml::Value) -> Result<()>;

    async fn run(&self) -> Result<()>;
}

pub type HookFactory = Arc<dyn Fn() -> Box<dyn Hook> + Send + Sync>;

#[derive(Clone, Default)]
pub struct HookRegistry {
    factories: BTreeMap<String, HookFactory>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Hook> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Hook> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Hook>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A configured hook instance, named `<build step>:<hook name>`.
#[derive(Debug)]
pub struct HookStep {
    pub name: String,
    pub hook: String,
    pub options: serde_yaml::Value,
    pub instance: Box<dyn Hook>,
}

impl PartialEq for HookStep {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.hook == other.hook && self.options == other.options
    }
}
