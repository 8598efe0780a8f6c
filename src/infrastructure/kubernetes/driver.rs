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

use crate::domain::deployment::CompiledDeployment;
use crate::domain::job::ClusterDefinition;
use crate::domain::pipeline::ClusterDriver;
use crate::infrastructure::kubernetes::client::{ClusterClient, ClusterClientImpl};
use crate::infrastructure::kubernetes::resources::{
    DeploymentBuilder, IngressBuilder, PvcBuilder, ResourceContext, SecretBuilder, ServiceBuilder,
};
use crate::shared::error::{PaasError, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Cluster driver writing a compiled deployment as Kubernetes objects.
#[derive(Debug, Default)]
pub struct KubernetesDriver {
    target: Option<Target>,
}

#[derive(Debug)]
struct Target {
    name: String,
    namespace: String,
    environment: String,
    client: Arc<dyn ClusterClient>,
}

impl KubernetesDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver already bound to `client`; `configure` keeps that client.
    pub fn with_client(
        name: impl Into<String>,
        namespace: impl Into<String>,
        environment: impl Into<String>,
        client: Arc<dyn ClusterClient>,
    ) -> Self {
        Self {
            target: Some(Target {
                name: name.into(),
                namespace: namespace.into(),
                environment: environment.into(),
                client,
            }),
        }
    }

    fn target(&self) -> Result<&Target> {
        self.target
            .as_ref()
            .ok_or_else(|| PaasError::contract("kubernetes driver used before configure"))
    }

    fn context(target: &Target, deployment: &CompiledDeployment) -> ResourceContext {
        ResourceContext::new(
            target.namespace.clone(),
            target.environment.clone(),
            deployment.job_id(),
        )
    }
}

#[async_trait::async_trait]
impl ClusterDriver for KubernetesDriver {
    async fn configure(&mut self, cluster: &ClusterDefinition) -> Result<()> {
        if let Some(target) = self.target.as_mut() {
            target.name = cluster.name.clone();
            return Ok(());
        }

        let client = ClusterClientImpl::new(cluster).await?;
        info!(
            "Configured cluster {} at {} (namespace {})",
            cluster.name, cluster.address, cluster.namespace
        );
        self.target = Some(Target {
            name: cluster.name.clone(),
            namespace: cluster.namespace.clone(),
            environment: cluster.environment.name.clone(),
            client: Arc::new(client),
        });
        Ok(())
    }

    async fn deploy(&self, deployment: &CompiledDeployment) -> Result<()> {
        let target = self.target()?;
        let context = Self::context(target, deployment);

        for secret in deployment.secrets() {
            if !SecretBuilder::is_supported(secret) {
                debug!(
                    "Secret {} uses provider {}, left to the cluster",
                    secret.name, secret.provider
                );
                continue;
            }
            let object = SecretBuilder::new(&context, secret).build()?;
            target.client.apply_secret(&object).await?;
        }

        for claim in PvcBuilder::all(&context, deployment) {
            target.client.apply_pvc(&claim).await?;
        }

        for pod in deployment.pods() {
            let object = DeploymentBuilder::new(&context, deployment, pod).build()?;
            target.client.apply_deployment(&object).await?;
            info!("Deployed pod {} on {}", pod.name, target.name);
        }
        Ok(())
    }

    async fn expose(&self, deployment: &CompiledDeployment) -> Result<()> {
        let target = self.target()?;
        let context = Self::context(target, deployment);

        let services: Vec<_> = deployment
            .services()
            .map(|service| ServiceBuilder::new(&context, service).build())
            .collect();
        try_join_all(
            services
                .iter()
                .map(|service| target.client.apply_service(service)),
        )
        .await?;

        for ingress in deployment.ingresses() {
            let object = IngressBuilder::new(&context, ingress).build();
            target.client.apply_ingress(&object).await?;
            info!("Exposed {} on {}", ingress.host, target.name);
        }
        Ok(())
    }
}
