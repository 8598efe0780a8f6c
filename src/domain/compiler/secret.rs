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

use crate::domain::compiler::{entries, CompileContext, SectionCompiler};
use crate::domain::deployment::{CompiledDeployment, Secret};
use crate::shared::error::{PaasError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

pub const DEFAULT_SECRET_TYPE: &str = "default";

#[derive(Debug, Clone, Default, Deserialize)]
struct SecretDefinition {
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    options: BTreeMap<String, Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Copies `secrets` verbatim. Option shapes are the provider's concern and
/// are only checked when a cluster driver materializes the secret.
#[derive(Debug, Clone, Default)]
pub struct SecretCompiler;

impl SecretCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SectionCompiler for SecretCompiler {
    fn section(&self) -> &'static str {
        "secrets"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        _context: &CompileContext<'_>,
    ) -> Result<()> {
        for (name, definition) in entries::<SecretDefinition>(section, "secret")? {
            let provider = definition
                .provider
                .ok_or_else(|| PaasError::reference(format!("secret '{}' has no provider", name)))?;
            deployment.add_secret(Secret {
                name,
                provider,
                options: definition.options,
                kind: definition
                    .kind
                    .unwrap_or_else(|| DEFAULT_SECRET_TYPE.to_string()),
            })?;
        }
        Ok(())
    }
}
