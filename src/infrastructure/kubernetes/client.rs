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

use crate::domain::job::{ClusterDefinition, Identity};
use crate::infrastructure::constants::FIELD_MANAGER;
use crate::shared::error::{PaasError, Result};
use backon::{ExponentialBuilder, Retryable};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, warn};

const APPLY_ATTEMPTS: usize = 3;

/// Writes the objects of a deployment into one namespace.
#[async_trait::async_trait]
pub trait ClusterClient: Send + Sync + Debug {
    async fn apply_secret(&self, secret: &Secret) -> Result<()>;

    async fn apply_pvc(&self, claim: &PersistentVolumeClaim) -> Result<()>;

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()>;

    async fn apply_service(&self, service: &Service) -> Result<()>;

    async fn apply_ingress(&self, ingress: &Ingress) -> Result<()>;
}

pub struct ClusterClientImpl {
    client: Client,
    namespace: String,
}

impl Debug for ClusterClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClientImpl")
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Builds an in-memory kubeconfig for a cluster definition.
pub fn kubeconfig_for(cluster: &ClusterDefinition) -> Result<Kubeconfig> {
    let mut server = json!({ "server": cluster.address });
    let mut user = json!({});

    match &cluster.identity {
        None => {}
        Some(Identity::Cluster {
            token,
            certificate_authority_data,
            client_certificate_data,
            client_key_data,
            username,
            password,
            ..
        }) => {
            if let Some(ca) = certificate_authority_data {
                server["certificate-authority-data"] = json!(ca);
            }
            if let Some(token) = token {
                user["token"] = json!(token);
            }
            if let Some(cert) = client_certificate_data {
                user["client-certificate-data"] = json!(cert);
            }
            if let Some(key) = client_key_data {
                user["client-key-data"] = json!(key);
            }
            if let Some(username) = username {
                user["username"] = json!(username);
            }
            if let Some(password) = password {
                user["password"] = json!(password);
            }
        }
        Some(other) => {
            return Err(PaasError::config_error(format!(
                "identity '{}' cannot authenticate cluster '{}'",
                other.name(),
                cluster.name
            )))
        }
    }

    let kubeconfig = json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{ "name": cluster.name, "cluster": server }],
        "users": [{ "name": cluster.name, "user": user }],
        "contexts": [{
            "name": cluster.name,
            "context": {
                "cluster": cluster.name,
                "user": cluster.name,
                "namespace": cluster.namespace,
            },
        }],
        "current-context": cluster.name,
    });

    serde_json::from_value(kubeconfig)
        .map_err(|e| PaasError::config_error(format!("Failed to build kubeconfig: {}", e)))
}

fn is_transient(error: &kube::Error) -> bool {
    match error {
        kube::Error::Api(response) => {
            response.code == 409 || response.code == 429 || response.code >= 500
        }
        kube::Error::HyperError(_) | kube::Error::Service(_) => true,
        _ => false,
    }
}

fn apply_backoff(min_delay: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(min_delay)
        .with_max_times(APPLY_ATTEMPTS)
}

impl ClusterClientImpl {
    pub async fn new(cluster: &ClusterDefinition) -> Result<Self> {
        let kubeconfig = kubeconfig_for(cluster)?;
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                PaasError::Kube(format!("Failed to create Kubernetes config: {}", e))
            })?;

        let client = Client::try_from(config).map_err(|e| {
            PaasError::Kube(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self {
            client,
            namespace: cluster.namespace.clone(),
        })
    }

    /// Server-side apply of `resource`, created when it does not exist yet.
    async fn apply_once<K>(&self, resource: &K) -> std::result::Result<(), kube::Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &self.namespace);
        let name = resource.meta().name.clone().unwrap_or_default();

        match api.get(&name).await {
            Ok(_) => {
                let patch_params = PatchParams::apply(FIELD_MANAGER).force();
                api.patch(&name, &patch_params, &Patch::Apply(resource))
                    .await?;
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                api.create(&PostParams::default(), resource).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn apply<K>(&self, resource: &K) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned
            + Send
            + Sync,
    {
        let kind = K::kind(&());
        let name = resource.meta().name.clone().ok_or_else(|| {
            PaasError::config_error(format!("{} name is required", kind))
        })?;

        let backoff = apply_backoff(Duration::from_millis(200));
        (|| async { self.apply_once(resource).await })
            .retry(&backoff)
            .when(is_transient)
            .notify(|e, delay| warn!("applying {} {} failed, retrying in {:?}: {}", kind, name, delay, e))
            .await
            .map_err(|e| PaasError::Kube(format!("Failed to apply {} {}: {}", kind, name, e)))?;

        debug!(kind = %kind, name = %name, namespace = %self.namespace, "applied");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClusterClient for ClusterClientImpl {
    async fn apply_secret(&self, secret: &Secret) -> Result<()> {
        self.apply(secret).await
    }

    async fn apply_pvc(&self, claim: &PersistentVolumeClaim) -> Result<()> {
        self.apply(claim).await
    }

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.apply(deployment).await
    }

    async fn apply_service(&self, service: &Service) -> Result<()> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);
        let name = service
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| PaasError::config_error("Service name is required"))?;

        // The cluster IP is immutable once allocated.
        let mut service_to_apply = service.clone();
        if let Ok(existing) = api.get(name).await {
            if let (Some(existing_spec), Some(new_spec)) =
                (&existing.spec, &mut service_to_apply.spec)
            {
                new_spec.cluster_ip = existing_spec.cluster_ip.clone();
                new_spec.cluster_ips = existing_spec.cluster_ips.clone();
            }
        }
        self.apply(&service_to_apply).await
    }

    async fn apply_ingress(&self, ingress: &Ingress) -> Result<()> {
        self.apply(ingress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{ClusterKind, Environment};

    fn cluster(identity: Option<Identity>) -> ClusterDefinition {
        ClusterDefinition {
            name: "main".to_string(),
            kind: ClusterKind::Kubernetes,
            address: "https://k8s.example.com:6443".to_string(),
            namespace: "demo".to_string(),
            identity,
            environment: Environment {
                name: "prod".to_string(),
            },
        }
    }

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "apply failed".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        for (code, expected) in [(503, APPLY_ATTEMPTS + 1), (422, 1)] {
            let attempts = AtomicUsize::new(0);
            let backoff = apply_backoff(Duration::from_millis(1));
            let result: std::result::Result<(), kube::Error> = (|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(api_error(code))
            })
            .retry(&backoff)
            .when(is_transient)
            .await;

            assert!(result.is_err());
            assert_eq!(attempts.load(Ordering::SeqCst), expected, "code {}", code);
        }
    }

    #[test]
    fn test_kubeconfig_uses_cluster_identity() {
        let config = kubeconfig_for(&cluster(Some(Identity::Cluster {
            name: "admin".to_string(),
            token: Some("abc".to_string()),
            certificate_authority_data: Some("Y2E=".to_string()),
            client_certificate_data: None,
            client_key_data: None,
            username: None,
            password: None,
        })))
        .unwrap();

        assert_eq!(config.current_context.as_deref(), Some("main"));
        let named = &config.clusters[0];
        let server = named.cluster.as_ref().unwrap();
        assert_eq!(server.server.as_deref(), Some("https://k8s.example.com:6443"));
        assert_eq!(server.certificate_authority_data.as_deref(), Some("Y2E="));
    }

    #[test]
    fn test_kubeconfig_rejects_ssh_identity() {
        let result = kubeconfig_for(&cluster(Some(Identity::Ssh {
            name: "deploy".to_string(),
            private_key: "key".to_string(),
        })));
        assert!(matches!(result, Err(PaasError::Config(_))));
    }
}
