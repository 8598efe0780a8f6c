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

//! `-D key=value` overrides applied on top of the TOML configuration.

use crate::domain::config::{EngineConfig, HookConf};
use crate::shared::error::{PaasError, Result};
use std::collections::HashMap;

/// Parse dynamic configuration properties from -D key=value format
pub fn parse_dynamic_configs(configs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for config in configs {
        let (key, value) = config.split_once('=').ok_or_else(|| {
            PaasError::config_error(format!(
                "Invalid config format: '{}'. Expected 'key=value'",
                config
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(PaasError::config_error(format!(
                "Empty key in config: '{}'",
                config
            )));
        }

        map.insert(key.to_string(), value.trim().to_string());
    }

    Ok(map)
}

pub fn apply_to_engine_config(
    configs: &HashMap<String, String>,
    conf: &mut EngineConfig,
) -> Result<()> {
    if let Some(root) = configs.get("workspace.root") {
        conf.workspace.root = root.clone();
    }

    if let Some(manifest) = configs.get("workspace.manifest") {
        conf.workspace.manifest = manifest.clone();
    }

    if let Some(class) = configs.get("compiler.default-storage-class") {
        conf.compiler.default_storage_class = Some(class.clone());
    }

    if let Some(size) = configs.get("compiler.default-storage-size") {
        conf.compiler.default_storage_size = size.clone();
    }

    if let Some(provider) = configs.get("compiler.default-ingress-provider") {
        conf.compiler.default_ingress_provider = Some(provider.clone());
    }

    if let Some(binary) = configs.get("builder.binary") {
        conf.builder.binary = binary.clone();
    }

    if let Some(timeout) = configs.get("builder.timeout") {
        conf.builder.timeout = parse_seconds("builder.timeout", timeout)?;
    }

    if let Some(image) = configs.get("builder.volume-base-image") {
        conf.builder.volume_base_image = image.clone();
    }

    if let Some(binary) = configs.get("git.binary") {
        conf.git.binary = binary.clone();
    }

    if let Some(timeout) = configs.get("git.timeout") {
        conf.git.timeout = parse_seconds("git.timeout", timeout)?;
    }

    if let Some(limit) = configs.get("pipeline.time-limit") {
        conf.pipeline.time_limit = parse_seconds("pipeline.time-limit", limit)?;
    }

    for (key, value) in configs {
        let hook = key
            .strip_prefix("hooks.")
            .and_then(|rest| rest.strip_suffix(".command"));
        if let Some(hook) = hook {
            conf.hooks
                .entry(hook.to_string())
                .or_insert_with(HookConf::default)
                .command = value.clone();
        }
    }

    Ok(())
}

fn parse_seconds(key: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|_| {
        PaasError::config_error(format!("{} expects a number of seconds, got '{}'", key, value))
    })
}
