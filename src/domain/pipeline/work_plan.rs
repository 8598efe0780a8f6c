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

use crate::domain::compiler::Conductor;
use crate::domain::deployment::CompiledDeployment;
use crate::domain::job::{History, JobUnit};
use crate::domain::pipeline::cluster::{ClusterCollection, DriverDirectory};
use crate::domain::pipeline::contracts::{CloningAgent, HistorySink, ImageBuilder, Workspace};
use crate::shared::error::{PaasError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The failure that routed a run to its error handlers.
#[derive(Debug)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: PaasError,
}

/// Context shared by the steps of one run.
///
/// Every entry is optional until the step producing it has run; steps read
/// their inputs through [`require`] and [`require_mut`], which report a
/// missing entry as a contract error.
#[derive(Debug, Default)]
pub struct WorkPlan {
    pub(crate) raw_job: Option<String>,
    pub(crate) job: Option<JobUnit>,
    pub(crate) workspace: Option<Box<dyn Workspace>>,
    pub(crate) cloning_agent: Option<Box<dyn CloningAgent>>,
    pub(crate) conductor: Option<Conductor>,
    pub(crate) deployment: Option<CompiledDeployment>,
    pub(crate) builder: Option<Box<dyn ImageBuilder>>,
    pub(crate) drivers: Option<Arc<DriverDirectory>>,
    pub(crate) clusters: Option<ClusterCollection>,
    pub(crate) history_sink: Option<Arc<dyn HistorySink>>,
    pub(crate) time_limit: Option<Duration>,
    pub(crate) deadline: Option<Instant>,
    pub(crate) failure: Option<StepFailure>,
    pub(crate) final_history: Option<History>,
}

impl WorkPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the JSON payload of a job, decoded by the first step.
    pub fn with_raw_job(mut self, payload: impl Into<String>) -> Self {
        self.raw_job = Some(payload.into());
        self
    }

    pub fn with_job(mut self, job: JobUnit) -> Self {
        self.job = Some(job);
        self
    }

    pub fn with_workspace(mut self, workspace: Box<dyn Workspace>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn with_cloning_agent(mut self, agent: Box<dyn CloningAgent>) -> Self {
        self.cloning_agent = Some(agent);
        self
    }

    pub fn with_conductor(mut self, conductor: Conductor) -> Self {
        self.conductor = Some(conductor);
        self
    }

    pub fn with_builder(mut self, builder: Box<dyn ImageBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_drivers(mut self, drivers: Arc<DriverDirectory>) -> Self {
        self.drivers = Some(drivers);
        self
    }

    pub fn with_history_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history_sink = Some(sink);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn job(&self) -> Option<&JobUnit> {
        self.job.as_ref()
    }

    pub fn deployment(&self) -> Option<&CompiledDeployment> {
        self.deployment.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        self.failure.as_ref()
    }

    pub fn final_history(&self) -> Option<&History> {
        self.final_history.as_ref()
    }
}

pub(crate) fn require<'a, T: ?Sized>(slot: &'a Option<Box<T>>, what: &str) -> Result<&'a T> {
    slot.as_deref()
        .ok_or_else(|| PaasError::contract(format!("work plan has no {}", what)))
}

pub(crate) fn require_mut<'a, T: ?Sized>(
    slot: &'a mut Option<Box<T>>,
    what: &str,
) -> Result<&'a mut T> {
    slot.as_deref_mut()
        .ok_or_else(|| PaasError::contract(format!("work plan has no {}", what)))
}

pub(crate) fn entry<'a, T>(slot: &'a Option<T>, what: &str) -> Result<&'a T> {
    slot.as_ref()
        .ok_or_else(|| PaasError::contract(format!("work plan has no {}", what)))
}

pub(crate) fn entry_mut<'a, T>(slot: &'a mut Option<T>, what: &str) -> Result<&'a mut T> {
    slot.as_mut()
        .ok_or_else(|| PaasError::contract(format!("work plan has no {}", what)))
}
