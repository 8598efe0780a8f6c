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

use crate::domain::compiler::scalar_to_string;
use crate::domain::config::HookConf;
use crate::domain::hook::{Hook, HookRegistry};
use crate::infrastructure::process::run_command;
use crate::shared::error::{PaasError, Result};
use async_trait::async_trait;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

const FORBIDDEN: &[char] = &[';', '|', '&', '$', '`', '>', '<', '\n', '\\'];

/// Runs a configured executable inside the checkout, e.g. a dependency
/// manager. Manifest options become its arguments.
#[derive(Debug, Clone)]
pub struct CommandHook {
    name: String,
    command: String,
    timeout: Duration,
    path: Option<PathBuf>,
    arguments: Vec<String>,
}

impl CommandHook {
    pub fn new(name: impl Into<String>, conf: &HookConf) -> Self {
        Self {
            name: name.into(),
            command: conf.command.clone(),
            timeout: Duration::from_secs(conf.timeout),
            path: None,
            arguments: Vec::new(),
        }
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    fn argument(&self, value: &Value) -> Result<String> {
        let argument = scalar_to_string(value).ok_or_else(|| {
            PaasError::hook(&self.name, "options must be a string or a list of scalars")
        })?;
        if argument.contains(FORBIDDEN) {
            return Err(PaasError::hook(
                &self.name,
                format!("argument '{}' contains a forbidden character", argument),
            ));
        }
        Ok(argument)
    }
}

#[async_trait]
impl Hook for CommandHook {
    fn set_path(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
    }

    fn set_options(&mut self, options: &Value) -> Result<()> {
        self.arguments = match options {
            Value::Null => Vec::new(),
            Value::Mapping(mapping) if mapping.is_empty() => Vec::new(),
            Value::String(line) => {
                let mut arguments = Vec::new();
                for part in line.split_whitespace() {
                    arguments.push(self.argument(&Value::from(part))?);
                }
                arguments
            }
            Value::Sequence(values) => values
                .iter()
                .map(|value| self.argument(value))
                .collect::<Result<Vec<_>>>()?,
            other => vec![self.argument(other)?],
        };
        Ok(())
    }

    async fn run(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| PaasError::contract(format!("hook '{}' has no working path", self.name)))?;

        let mut cmd = Command::new(&self.command);
        cmd.args(&self.arguments).current_dir(path);
        run_command(&mut cmd, &format!("hook {}", self.name), self.timeout)
            .await
            .map_err(|reason| PaasError::hook(&self.name, reason))?;
        Ok(())
    }
}

/// A registry handing out one [`CommandHook`] per configured hook.
pub fn command_hooks(hooks: &BTreeMap<String, HookConf>) -> HookRegistry {
    let mut registry = HookRegistry::new();
    for (name, conf) in hooks {
        let name = name.clone();
        let conf = conf.clone();
        registry.register(name.clone(), move || {
            Box::new(CommandHook::new(name.clone(), &conf)) as Box<dyn Hook>
        });
    }
    registry
}
