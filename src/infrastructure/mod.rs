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

pub mod builder;
pub mod constants;
pub mod git;
pub mod history;
pub mod hooks;
pub mod kubernetes;
pub mod process;
pub mod workspace;

pub use self::builder::OciImageBuilder;
pub use self::git::GitCloningAgent;
pub use self::history::JsonLinesHistorySink;
pub use self::hooks::{command_hooks, CommandHook};
pub use self::kubernetes::KubernetesDriver;
pub use self::workspace::LocalWorkspace;
