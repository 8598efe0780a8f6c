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
use crate::domain::deployment::CompiledDeployment;
use crate::domain::hook::{HookRegistry, HookStep};
use crate::shared::error::{PaasError, Result};
use serde_yaml::Value;
use std::sync::Arc;
use tracing::debug;

/// Compiles `builds` into configured hook instances, one fresh instance per
/// declared hook.
#[derive(Debug, Clone, Default)]
pub struct HookCompiler {
    registry: Arc<HookRegistry>,
}

impl HookCompiler {
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }
}

impl SectionCompiler for HookCompiler {
    fn section(&self) -> &'static str {
        "builds"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        _context: &CompileContext<'_>,
    ) -> Result<()> {
        for (step, hooks) in entries::<Value>(section, "build step")? {
            for (hook, options) in entries::<Value>(&hooks, "hook")? {
                let mut instance = self.registry.create(&hook).ok_or_else(|| {
                    PaasError::reference(format!(
                        "hook '{}' of build step '{}' is not available",
                        hook, step
                    ))
                })?;
                instance.set_options(&options)?;

                let name = format!("{}:{}", step, hook);
                debug!(hook = %name, "compiled hook");
                deployment.add_hook(HookStep {
                    name,
                    hook,
                    options,
                    instance,
                })?;
            }
        }
        Ok(())
    }
}
