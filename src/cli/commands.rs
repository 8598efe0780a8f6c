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

// CLI command definitions

use super::job::{CompileCommand, HistoryCommand, RunCommand};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "paas-deploy",
    version,
    about = "Deployment engine for PaaS jobs",
    long_about = "Compiles a project's deployment manifest and runs the deployment pipeline of a job: clone, build, deploy and expose"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the full deployment pipeline of a job
    Run(RunCommand),

    /// Compile a manifest for a job and print the result
    Compile(CompileCommand),

    /// Show the History chain recorded on a job
    History(HistoryCommand),
}
