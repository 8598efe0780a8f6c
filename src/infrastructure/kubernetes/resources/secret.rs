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
use crate::domain::deployment::Secret;
use crate::infrastructure::constants::{
    SECRET_PROVIDER_MAP, SECRET_TYPE_OPAQUE, SECRET_TYPE_TLS, SUFFIX_SECRET,
};
use crate::infrastructure::kubernetes::resources::{kube_name, ResourceContext};
use crate::shared::error::{PaasError, Result};
use k8s_openapi::api::core::v1;
use std::collections::BTreeMap;

pub fn secret_name(secret: &str) -> String {
    format!("{}{}", kube_name(secret), SUFFIX_SECRET)
}

/// Builds the Kubernetes secret of a `map` provider secret. Its options are
/// the secret's keys.
pub struct SecretBuilder<'a> {
    context: &'a ResourceContext,
    secret: &'a Secret,
}

impl<'a> SecretBuilder<'a> {
    pub fn new(context: &'a ResourceContext, secret: &'a Secret) -> Self {
        Self { context, secret }
    }

    pub fn is_supported(secret: &Secret) -> bool {
        secret.provider == SECRET_PROVIDER_MAP
    }

    pub fn build(&self) -> Result<v1::Secret> {
        if !Self::is_supported(self.secret) {
            return Err(PaasError::config_error(format!(
                "secret '{}' uses provider '{}', only '{}' is written to clusters",
                self.secret.name, self.secret.provider, SECRET_PROVIDER_MAP
            )));
        }

        let mut data = BTreeMap::new();
        for (key, value) in &self.secret.options {
            let value = scalar_to_string(value).ok_or_else(|| {
                PaasError::config_error(format!(
                    "option '{}' of secret '{}' must be a scalar",
                    key, self.secret.name
                ))
            })?;
            data.insert(key.clone(), value);
        }

        let type_ = match self.secret.kind.as_str() {
            "default" => SECRET_TYPE_OPAQUE.to_string(),
            "tls" => SECRET_TYPE_TLS.to_string(),
            other => other.to_string(),
        };

        Ok(v1::Secret {
            metadata: self.context.metadata(secret_name(&self.secret.name)),
            string_data: Some(data),
            type_: Some(type_),
            ..Default::default()
        })
    }
}
