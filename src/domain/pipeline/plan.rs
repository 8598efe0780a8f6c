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

use crate::domain::job::{History, JobUnit};
use crate::domain::pipeline::step::{JobState, Step};
use crate::domain::pipeline::work_plan::{StepFailure, WorkPlan};
use crate::shared::error::{PaasError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Collects `(priority, step)` pairs; ties keep their declaration order.
#[derive(Default)]
pub struct PlanBuilder {
    steps: Vec<(i32, Arc<dyn Step>)>,
    error_handlers: Vec<Arc<dyn Step>>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, priority: i32, step: impl Step + 'static) -> Self {
        self.steps.push((priority, Arc::new(step)));
        self
    }

    pub fn shared_step(mut self, priority: i32, step: Arc<dyn Step>) -> Self {
        self.steps.push((priority, step));
        self
    }

    /// Handlers run in registration order once a step has failed.
    pub fn on_error(mut self, handler: impl Step + 'static) -> Self {
        self.error_handlers.push(Arc::new(handler));
        self
    }

    pub fn build(mut self) -> Plan {
        self.steps.sort_by_key(|(priority, _)| *priority);
        Plan {
            steps: self.steps.into_iter().map(|(_, step)| step).collect(),
            error_handlers: self.error_handlers,
        }
    }
}

/// Outcome of one run.
#[derive(Debug)]
pub struct RunReport {
    /// Last state reached before the run ended.
    pub state: JobState,
    pub failed_step: Option<&'static str>,
    pub error: Option<PaasError>,
    pub handlers_run: Vec<&'static str>,
    pub history: Option<History>,
    pub job: Option<JobUnit>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// An ordered list of steps plus the handlers a failure is routed to.
pub struct Plan {
    steps: Vec<Arc<dyn Step>>,
    error_handlers: Vec<Arc<dyn Step>>,
}

impl Plan {
    pub fn builder() -> PlanBuilder {
        PlanBuilder::new()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn error_handler_names(&self) -> Vec<&'static str> {
        self.error_handlers.iter().map(|step| step.name()).collect()
    }

    /// Runs every step in order. A step never starts before the previous one
    /// finished; the first failure stops the run and hands the work plan to
    /// every error handler.
    pub async fn run(&self, mut plan: WorkPlan, cancel: CancellationToken) -> RunReport {
        let mut state = JobState::Received;

        for step in &self.steps {
            let result = if cancel.is_cancelled() {
                Err(PaasError::Cancelled)
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(PaasError::Cancelled),
                    result = guarded(step.as_ref(), &mut plan) => result,
                }
            };

            match result {
                Ok(()) => {
                    if let Some(reached) = step.reaches() {
                        state = reached;
                        info!(step = step.name(), state = %state, "step done");
                    }
                }
                Err(e) => {
                    error!(step = step.name(), state = %state, "step failed: {}", e);
                    plan.failure = Some(StepFailure {
                        step: step.name(),
                        error: e,
                    });
                    let handlers_run = self.handle_failure(&mut plan).await;
                    let failure = plan.failure.take();
                    return RunReport {
                        state,
                        failed_step: failure.as_ref().map(|f| f.step),
                        error: failure.map(|f| f.error),
                        handlers_run,
                        history: plan.final_history.take(),
                        job: plan.job.take(),
                    };
                }
            }
        }

        RunReport {
            state,
            failed_step: None,
            error: None,
            handlers_run: Vec::new(),
            history: plan.final_history.take(),
            job: plan.job.take(),
        }
    }

    async fn handle_failure(&self, plan: &mut WorkPlan) -> Vec<&'static str> {
        let mut ran = Vec::with_capacity(self.error_handlers.len());
        for handler in &self.error_handlers {
            if let Err(e) = handler.execute(plan).await {
                warn!(handler = handler.name(), "error handler failed: {}", e);
            }
            ran.push(handler.name());
        }
        ran
    }
}

/// Bounds a step by the deadline currently set in the work plan.
async fn guarded(step: &dyn Step, plan: &mut WorkPlan) -> Result<()> {
    match plan.deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, step.execute(plan))
            .await
            .map_err(|_| PaasError::Timeout(format!("time limit reached during '{}'", step.name())))?,
        None => step.execute(plan).await,
    }
}
