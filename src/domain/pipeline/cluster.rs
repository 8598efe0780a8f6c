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
use crate::domain::job::{ClusterDefinition, ClusterKind};
use crate::domain::pipeline::contracts::ClusterDriver;
use crate::shared::error::{PaasError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub type DriverFactory = Arc<dyn Fn() -> Box<dyn ClusterDriver> + Send + Sync>;

/// Known cluster drivers, by cluster type.
#[derive(Clone, Default)]
pub struct DriverDirectory {
    factories: BTreeMap<ClusterKind, DriverFactory>,
}

impl DriverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, kind: ClusterKind, factory: F) -> Self
    where
        F: Fn() -> Box<dyn ClusterDriver> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Arc::new(factory));
        self
    }

    /// Instantiates and configures one driver per cluster, in job order.
    pub async fn configure_all(&self, clusters: &[ClusterDefinition]) -> Result<ClusterCollection> {
        let mut collection = ClusterCollection::new();
        for cluster in clusters {
            let factory = self.factories.get(&cluster.kind).ok_or_else(|| {
                PaasError::config_error(format!(
                    "no driver available for cluster '{}' of type '{}'",
                    cluster.name,
                    cluster.kind.as_str()
                ))
            })?;

            let mut driver = factory();
            driver
                .configure(cluster)
                .await
                .map_err(|e| attribute(&cluster.name, e))?;
            collection.push(cluster.name.clone(), driver);
        }
        Ok(collection)
    }
}

impl fmt::Debug for DriverDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverDirectory")
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Configured drivers of one job. Deploy and expose visit clusters in
/// insertion order and stop at the first failure.
#[derive(Debug, Default)]
pub struct ClusterCollection {
    drivers: Vec<(String, Box<dyn ClusterDriver>)>,
}

impl ClusterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cluster: impl Into<String>, driver: Box<dyn ClusterDriver>) {
        self.drivers.push((cluster.into(), driver));
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.iter().map(|(name, _)| name.as_str())
    }

    pub async fn deploy(&self, deployment: &CompiledDeployment) -> Result<()> {
        for (cluster, driver) in &self.drivers {
            info!(cluster = %cluster, job_id = %deployment.job_id(), "deploying");
            driver
                .deploy(deployment)
                .await
                .map_err(|e| attribute(cluster, e))?;
        }
        Ok(())
    }

    pub async fn expose(&self, deployment: &CompiledDeployment) -> Result<()> {
        for (cluster, driver) in &self.drivers {
            info!(cluster = %cluster, job_id = %deployment.job_id(), "exposing");
            driver
                .expose(deployment)
                .await
                .map_err(|e| attribute(cluster, e))?;
        }
        Ok(())
    }
}

/// Tags a driver failure with the cluster it happened on.
fn attribute(cluster: &str, error: PaasError) -> PaasError {
    match error {
        PaasError::Driver { .. }
        | PaasError::Cancelled
        | PaasError::Timeout(_)
        | PaasError::Config(_)
        | PaasError::Reference(_) => error,
        other => PaasError::driver(cluster, other.to_string()),
    }
}
