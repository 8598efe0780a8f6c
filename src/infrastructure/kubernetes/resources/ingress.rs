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

use crate::domain::deployment::{Ingress, IngressBackend as Backend};
use crate::infrastructure::constants::{PATH_TYPE_PREFIX, SUFFIX_INGRESS};
use crate::infrastructure::kubernetes::resources::secret::secret_name;
use crate::infrastructure::kubernetes::resources::service::service_name;
use crate::infrastructure::kubernetes::resources::{kube_name, ResourceContext};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress as KubeIngress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub fn ingress_name(ingress: &str) -> String {
    format!("{}{}", kube_name(ingress), SUFFIX_INGRESS)
}

/// Builds one ingress serving the host and each alias with the same routes.
/// Without explicit paths the default backend serves `/`.
pub struct IngressBuilder<'a> {
    context: &'a ResourceContext,
    ingress: &'a Ingress,
}

fn backend(target: &Backend) -> IngressBackend {
    IngressBackend {
        service: Some(IngressServiceBackend {
            name: service_name(&target.service),
            port: Some(ServiceBackendPort {
                number: Some(target.port as i32),
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

fn path(path: &str, target: &Backend) -> HTTPIngressPath {
    HTTPIngressPath {
        path: Some(path.to_string()),
        path_type: PATH_TYPE_PREFIX.to_string(),
        backend: backend(target),
    }
}

impl<'a> IngressBuilder<'a> {
    pub fn new(context: &'a ResourceContext, ingress: &'a Ingress) -> Self {
        Self { context, ingress }
    }

    fn hosts(&self) -> Vec<String> {
        std::iter::once(&self.ingress.host)
            .chain(self.ingress.aliases.iter())
            .cloned()
            .collect()
    }

    pub fn build(&self) -> KubeIngress {
        let mut paths: Vec<HTTPIngressPath> = self
            .ingress
            .paths
            .iter()
            .map(|p| path(&p.path, &p.backend))
            .collect();
        if paths.is_empty() {
            if let Some(default) = &self.ingress.default_backend {
                paths.push(path("/", default));
            }
        }

        let rules = self
            .hosts()
            .into_iter()
            .map(|host| IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: paths.clone(),
                }),
                ..Default::default()
            })
            .collect();

        let tls = self.ingress.tls_secret.as_ref().map(|secret| {
            vec![IngressTLS {
                hosts: Some(self.hosts()),
                secret_name: Some(secret_name(secret)),
                ..Default::default()
            }]
        });

        let metadata = self.context.metadata(ingress_name(&self.ingress.name));
        let annotations = if self.ingress.meta.is_empty() {
            None
        } else {
            Some(self.ingress.meta.clone())
        };

        KubeIngress {
            metadata: ObjectMeta {
                annotations,
                ..metadata
            },
            spec: Some(IngressSpec {
                ingress_class_name: self.ingress.provider.clone(),
                default_backend: self.ingress.default_backend.as_ref().map(backend),
                rules: Some(rules),
                tls,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
