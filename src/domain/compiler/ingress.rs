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

use crate::domain::compiler::{entries, scalar_to_string, CompileContext, SectionCompiler};
use crate::domain::deployment::{CompiledDeployment, Ingress, IngressBackend, IngressPath};
use crate::shared::error::{PaasError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
struct IngressDefinition {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    tls: Option<TlsDefinition>,
    #[serde(default)]
    service: Option<BackendDefinition>,
    #[serde(default)]
    paths: Vec<PathDefinition>,
    #[serde(default)]
    meta: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct TlsDefinition {
    secret: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendDefinition {
    name: String,
    port: u16,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PathDefinition {
    path: String,
    service: BackendDefinition,
}

#[derive(Debug, Clone, Default)]
pub struct IngressCompiler;

impl IngressCompiler {
    pub fn new() -> Self {
        Self
    }
}

fn backend(
    ingress: &str,
    definition: &BackendDefinition,
    deployment: &CompiledDeployment,
) -> Result<IngressBackend> {
    let service = deployment.service(&definition.name).ok_or_else(|| {
        PaasError::reference(format!(
            "ingress '{}' routes to undeclared service '{}'",
            ingress, definition.name
        ))
    })?;

    if !service.ports.iter().any(|port| port.listen == definition.port) {
        return Err(PaasError::reference(format!(
            "ingress '{}' routes to port {} which service '{}' does not listen on",
            ingress, definition.port, definition.name
        )));
    }

    Ok(IngressBackend {
        service: definition.name.clone(),
        port: definition.port,
    })
}

impl SectionCompiler for IngressCompiler {
    fn section(&self) -> &'static str {
        "ingresses"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        context: &CompileContext<'_>,
    ) -> Result<()> {
        for (name, definition) in entries::<IngressDefinition>(section, "ingress")? {
            let host = definition
                .host
                .ok_or_else(|| PaasError::reference(format!("ingress '{}' has no host", name)))?;

            let default_backend = definition
                .service
                .as_ref()
                .map(|service| backend(&name, service, deployment))
                .transpose()?;

            let mut paths = Vec::with_capacity(definition.paths.len());
            for path in &definition.paths {
                paths.push(IngressPath {
                    path: path.path.clone(),
                    backend: backend(&name, &path.service, deployment)?,
                });
            }

            if default_backend.is_none() && paths.is_empty() {
                return Err(PaasError::reference(format!(
                    "ingress '{}' has neither a service nor paths",
                    name
                )));
            }

            let mut meta = BTreeMap::new();
            for (key, value) in definition.meta {
                let value = scalar_to_string(&value).ok_or_else(|| {
                    PaasError::Manifest(format!("meta '{}' of ingress '{}' must be a scalar", key, name))
                })?;
                meta.insert(key, value);
            }

            let tls_secret = definition.tls.map(|tls| tls.secret);
            if let Some(secret) = &tls_secret {
                if deployment.secret(secret).is_none() {
                    return Err(PaasError::reference(format!(
                        "ingress '{}' uses undeclared TLS secret '{}'",
                        name, secret
                    )));
                }
            }

            let provider = definition
                .service
                .and_then(|service| service.provider)
                .or_else(|| context.default_ingress_provider.map(str::to_string));

            let ingress = Ingress {
                name,
                host,
                aliases: definition.aliases,
                provider,
                default_backend,
                paths,
                tls_secret,
                meta,
            };
            debug!(ingress = %ingress.name, host = %ingress.host, "compiled ingress");
            deployment.add_ingress(ingress)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compiler::test_support::{context, job, section, with_pod};
    use crate::domain::deployment::{Protocol, Secret, Service, Transport};

    fn exposed() -> CompiledDeployment {
        let mut deployment = with_pod("web", vec![80]);
        deployment
            .add_service(Service {
                name: "web".to_string(),
                pod: "web".to_string(),
                ports: vec![Transport { listen: 80, target: 80 }],
                protocol: Protocol::Tcp,
                internal: false,
            })
            .unwrap();
        deployment
            .add_secret(Secret {
                name: "cert".to_string(),
                provider: "map".to_string(),
                options: BTreeMap::new(),
                kind: "tls".to_string(),
            })
            .unwrap();
        deployment
    }

    fn compile(yaml: &str) -> Result<CompiledDeployment> {
        let job = job();
        let mut deployment = exposed();
        IngressCompiler::new().compile(&section(yaml), &mut deployment, &context(&job))?;
        Ok(deployment)
    }

    #[test]
    fn test_paths_tls_and_default_provider() {
        let deployment = compile(
            "public:\n  host: shop.example.com\n  tls:\n    secret: cert\n  paths:\n    - path: /api\n      service:\n        name: web\n        port: 80\n  meta:\n    timeout: 30\n",
        )
        .unwrap();

        let ingress = deployment.ingresses().next().unwrap();
        assert!(ingress.default_backend.is_none());
        assert_eq!(ingress.paths[0].path, "/api");
        assert_eq!(ingress.paths[0].backend.service, "web");
        assert_eq!(ingress.tls_secret.as_deref(), Some("cert"));
        assert_eq!(ingress.provider.as_deref(), Some("nginx"));
        assert_eq!(ingress.meta["timeout"], "30");
    }

    #[test]
    fn test_backend_port_must_be_listened_on() {
        let result = compile("public:\n  host: a.example.com\n  service:\n    name: web\n    port: 8080\n");
        assert!(matches!(result, Err(PaasError::Reference(_))));
    }

    #[test]
    fn test_unknown_references_fail() {
        let service = compile("public:\n  host: a.example.com\n  service:\n    name: api\n    port: 80\n");
        assert!(matches!(service, Err(PaasError::Reference(_))));

        let tls = compile(
            "public:\n  host: a.example.com\n  tls:\n    secret: missing\n  service:\n    name: web\n    port: 80\n",
        );
        match tls {
            Err(PaasError::Reference(message)) => assert!(message.contains("missing")),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }

        let empty = compile("public:\n  host: a.example.com\n");
        assert!(matches!(empty, Err(PaasError::Reference(_))));
    }
}
