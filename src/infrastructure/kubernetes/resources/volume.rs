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

use crate::domain::deployment::{CompiledDeployment, PersistentVolume, Volume};
use crate::infrastructure::constants::{DEFAULT_ACCESS_MODE, SUFFIX_PVC};
use crate::infrastructure::kubernetes::resources::{kube_name, ResourceContext};
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

pub fn claim_name(volume: &str) -> String {
    format!("{}{}", kube_name(volume), SUFFIX_PVC)
}

pub struct PvcBuilder<'a> {
    context: &'a ResourceContext,
    volume: &'a PersistentVolume,
}

impl<'a> PvcBuilder<'a> {
    pub fn new(context: &'a ResourceContext, volume: &'a PersistentVolume) -> Self {
        Self { context, volume }
    }

    /// Persistent volumes of every container, one claim per volume name.
    pub fn all(context: &'a ResourceContext, deployment: &'a CompiledDeployment) -> Vec<PersistentVolumeClaim> {
        let mut volumes = BTreeMap::new();
        for (_, container) in deployment.containers() {
            for volume in container.volumes.values() {
                if let Volume::Persistent(persistent) = volume {
                    volumes.entry(persistent.name.as_str()).or_insert(persistent);
                }
            }
        }
        volumes
            .values()
            .map(|volume| PvcBuilder::new(context, *volume).build())
            .collect()
    }

    pub fn build(&self) -> PersistentVolumeClaim {
        let mut requests = BTreeMap::new();
        requests.insert(
            "storage".to_string(),
            Quantity(self.volume.storage_size.clone()),
        );

        PersistentVolumeClaim {
            metadata: self.context.metadata(claim_name(&self.volume.name)),
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec![DEFAULT_ACCESS_MODE.to_string()]),
                storage_class_name: self.volume.storage_class.clone(),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(requests),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
