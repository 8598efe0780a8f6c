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
use crate::domain::deployment::{CompiledDeployment, Protocol, Service, Transport};
use crate::shared::error::{PaasError, Result};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ServiceDefinition {
    #[serde(default)]
    pod: Option<String>,
    #[serde(default)]
    internal: Option<bool>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    ports: Vec<PortDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
struct PortDefinition {
    listen: u16,
    #[serde(default)]
    target: Option<u16>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceCompiler;

impl ServiceCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl SectionCompiler for ServiceCompiler {
    fn section(&self) -> &'static str {
        "services"
    }

    fn compile(
        &self,
        section: &Value,
        deployment: &mut CompiledDeployment,
        _context: &CompileContext<'_>,
    ) -> Result<()> {
        for (name, definition) in entries::<ServiceDefinition>(section, "service")? {
            let pod = definition.pod.unwrap_or_else(|| name.clone());
            if deployment.pod(&pod).is_none() {
                return Err(PaasError::reference(format!(
                    "service '{}' targets undeclared pod '{}'",
                    name, pod
                )));
            }

            let protocol = match definition.protocol.as_deref() {
                None => Protocol::default(),
                Some(protocol) => protocol
                    .parse()
                    .map_err(|e: String| PaasError::Manifest(format!("service '{}': {}", name, e)))?,
            };

            if definition.ports.is_empty() {
                return Err(PaasError::reference(format!("service '{}' has no port", name)));
            }
            let ports = definition
                .ports
                .iter()
                .map(|port| Transport {
                    listen: port.listen,
                    target: port.target.unwrap_or(port.listen),
                })
                .collect();

            let service = Service {
                name,
                pod,
                ports,
                protocol,
                internal: definition.internal.unwrap_or(true),
            };
            debug!(service = %service.name, pod = %service.pod, "compiled service");
            deployment.add_service(service)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compiler::test_support::{context, job, section, with_pod};

    #[test]
    fn test_defaults() {
        let job = job();
        let mut deployment = with_pod("web", vec![80]);
        ServiceCompiler::new()
            .compile(&section("web:\n  ports:\n    - listen: 80\n"), &mut deployment, &context(&job))
            .unwrap();

        let service = deployment.service("web").unwrap();
        assert_eq!(service.pod, "web");
        assert_eq!(service.protocol, Protocol::Tcp);
        assert!(service.internal);
        assert_eq!(service.ports, vec![Transport { listen: 80, target: 80 }]);
    }

    #[test]
    fn test_explicit_pod_and_target() {
        let job = job();
        let mut deployment = with_pod("web", vec![8080]);
        let yaml = "public:\n  pod: web\n  internal: false\n  protocol: UDP\n  ports:\n    - listen: 53\n      target: 8080\n";
        ServiceCompiler::new()
            .compile(&section(yaml), &mut deployment, &context(&job))
            .unwrap();

        let service = deployment.service("public").unwrap();
        assert_eq!(service.pod, "web");
        assert_eq!(service.protocol, Protocol::Udp);
        assert!(!service.internal);
        assert_eq!(service.ports[0].target, 8080);
    }

    #[test]
    fn test_rejects_missing_pod_and_ports() {
        let job = job();
        let mut deployment = with_pod("web", vec![80]);
        let compiler = ServiceCompiler::new();

        let missing_pod = compiler.compile(
            &section("api:\n  pod: backend\n  ports:\n    - listen: 80\n"),
            &mut deployment,
            &context(&job),
        );
        assert!(matches!(missing_pod, Err(PaasError::Reference(_))));

        let no_ports = compiler.compile(&section("web: {}\n"), &mut deployment, &context(&job));
        assert!(matches!(no_ports, Err(PaasError::Reference(_))));
    }
}
