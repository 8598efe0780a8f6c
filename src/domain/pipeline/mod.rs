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

//! Job pipeline: an ordered plan of steps over a shared work plan.

pub mod cluster;
pub mod contracts;
pub mod plan;
pub mod recipe;
pub mod sink;
pub mod step;
pub mod steps;
pub mod work_plan;

pub use self::cluster::{ClusterCollection, DriverDirectory, DriverFactory};
pub use self::contracts::{ClusterDriver, CloningAgent, HistorySink, ImageBuilder, Workspace};
pub use self::plan::{Plan, PlanBuilder, RunReport};
pub use self::recipe::deployment_plan;
pub use self::sink::{ChannelHistorySink, HistoryEvent, LogHistorySink};
pub use self::step::{JobState, Step};
pub use self::work_plan::{StepFailure, WorkPlan};
