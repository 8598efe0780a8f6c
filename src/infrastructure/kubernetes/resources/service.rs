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

use crate::domain::deployment::Service;
use crate::infrastructure::constants::{LABEL_APP, SERVICE_TYPE_CLUSTER_IP, SERVICE_TYPE_LOAD_BALANCER};
use crate::infrastructure::kubernetes::resources::{kube_name, ResourceContext};
use k8s_openapi::api::core::v1;
use k8s_openapi::api::core::v1::{ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Kubernetes services keep the manifest name so that containers reach each
/// other by it.
pub fn service_name(service: &str) -> String {
    kube_name(service)
}

pub struct ServiceBuilder<'a> {
    context: &'a ResourceContext,
    service: &'a Service,
}

impl<'a> ServiceBuilder<'a> {
    pub fn new(context: &'a ResourceContext, service: &'a Service) -> Self {
        Self { context, service }
    }

    pub fn build(&self) -> v1::Service {
        let protocol = self.service.protocol.as_str();
        let ports = self
            .service
            .ports
            .iter()
            .map(|transport| ServicePort {
                name: Some(format!("{}-{}", protocol.to_ascii_lowercase(), transport.listen)),
                port: transport.listen as i32,
                target_port: Some(IntOrString::Int(transport.target as i32)),
                protocol: Some(protocol.to_string()),
                ..Default::default()
            })
            .collect();

        let mut selector = BTreeMap::new();
        selector.insert(LABEL_APP.to_string(), kube_name(&self.service.pod));

        let service_type = if self.service.internal {
            SERVICE_TYPE_CLUSTER_IP
        } else {
            SERVICE_TYPE_LOAD_BALANCER
        };

        v1::Service {
            metadata: self.context.metadata(service_name(&self.service.name)),
            spec: Some(ServiceSpec {
                type_: Some(service_type.to_string()),
                ports: Some(ports),
                selector: Some(selector),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
