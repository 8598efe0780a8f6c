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

//! Pure builders turning a compiled deployment into Kubernetes objects.

pub mod deployment;
pub mod ingress;
pub mod secret;
pub mod service;
pub mod volume;

pub use self::deployment::DeploymentBuilder;
pub use self::ingress::IngressBuilder;
pub use self::secret::SecretBuilder;
pub use self::service::ServiceBuilder;
pub use self::volume::PvcBuilder;

use crate::infrastructure::constants::{
    LABEL_ENVIRONMENT, LABEL_JOB, LABEL_MANAGED_BY, MANAGED_BY_VALUE,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Where the objects of one job go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContext {
    pub namespace: String,
    pub environment: String,
    pub job_id: String,
}

impl ResourceContext {
    pub fn new(
        namespace: impl Into<String>,
        environment: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            environment: environment.into(),
            job_id: job_id.into(),
        }
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_ENVIRONMENT.to_string(), kube_name(&self.environment));
        labels.insert(LABEL_JOB.to_string(), kube_name(&self.job_id));
        labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY_VALUE.to_string());
        labels
    }

    pub fn metadata(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels()),
            ..Default::default()
        }
    }
}

/// Lowercases a manifest name and replaces anything a DNS label does not
/// allow with `-`.
pub fn kube_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    sanitized.truncate(63);
    sanitized.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kube_name() {
        assert_eq!(kube_name("My_Pod"), "my-pod");
        assert_eq!(kube_name("php.fpm-"), "php-fpm");
        assert_eq!(kube_name(&"a".repeat(80)).len(), 63);
    }
}
