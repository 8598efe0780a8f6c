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

//! Job commands

use super::display::TableRenderer;
use crate::domain::compiler::{CompilerCollection, Conductor};
use crate::domain::config::{apply_to_engine_config, parse_dynamic_configs, EngineConfig};
use crate::domain::job::{ClusterKind, JobUnit};
use crate::domain::pipeline::{deployment_plan, DriverDirectory, WorkPlan};
use crate::infrastructure::{
    command_hooks, GitCloningAgent, JsonLinesHistorySink, KubernetesDriver, LocalWorkspace,
    OciImageBuilder,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Environment variable naming the engine configuration file.
pub const CONF_FILE_ENV: &str = "PAAS_DEPLOY_CONF_FILE";

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    /// Path to the job document (JSON)
    #[arg(long, short = 'j', value_name = "PATH")]
    pub job: String,

    /// Path to the engine configuration file (TOML)
    /// If not provided, reads PAAS_DEPLOY_CONF_FILE, then falls back to defaults
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<String>,

    /// Dynamic configuration properties (-D key=value)
    ///
    /// Workspace: workspace.root, workspace.manifest
    /// Compiler: compiler.default-storage-class, compiler.default-storage-size, compiler.default-ingress-provider
    /// Builder: builder.binary, builder.timeout, builder.volume-base-image
    /// Git: git.binary, git.timeout
    /// Pipeline: pipeline.time-limit (seconds)
    /// Hooks: hooks.NAME.command
    ///
    /// Example: -Dbuilder.binary=podman -Dpipeline.time-limit=900
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompileCommand {
    /// Path to the job document (JSON)
    #[arg(long, short = 'j', value_name = "PATH")]
    pub job: String,

    /// Path to the manifest to compile
    #[arg(long, short = 'm', value_name = "PATH")]
    pub manifest: String,

    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<String>,

    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct HistoryCommand {
    /// Path to the job document (JSON)
    #[arg(long, short = 'j', value_name = "PATH")]
    pub job: String,
}

/// Loads the engine configuration: `--config` > environment > defaults, then
/// applies `-D` properties.
pub fn load_engine_config(
    config: Option<&str>,
    properties: &[String],
) -> anyhow::Result<EngineConfig> {
    let mut conf = if let Some(path) = config {
        EngineConfig::from(path)?
    } else if let Ok(env_path) = std::env::var(CONF_FILE_ENV) {
        EngineConfig::from(&env_path)?
    } else {
        info!("No configuration file specified, using default settings");
        EngineConfig::default()
    };

    if !properties.is_empty() {
        let dynamic_configs = parse_dynamic_configs(properties)
            .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))?;
        apply_to_engine_config(&dynamic_configs, &mut conf)?;
    }

    conf.validate()?;
    Ok(conf)
}

fn read_file(path: &str, what: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {} {}: {}", what, path, e))
}

fn compilers(conf: &EngineConfig) -> Arc<CompilerCollection> {
    let registry = Arc::new(command_hooks(&conf.hooks));
    Arc::new(CompilerCollection::new(
        conf.images.clone(),
        registry,
        conf.compiler.clone(),
    ))
}

impl RunCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let conf = load_engine_config(self.config.as_deref(), &self.properties)?;
        let payload = read_file(&self.job, "job")?;

        let drivers = DriverDirectory::new().with(ClusterKind::Kubernetes, || {
            Box::new(KubernetesDriver::new())
        });
        let time_limit = Duration::from_secs(conf.pipeline.time_limit);

        let work_plan = WorkPlan::new()
            .with_raw_job(payload)
            .with_workspace(Box::new(LocalWorkspace::new(&conf.workspace)))
            .with_cloning_agent(Box::new(GitCloningAgent::new(&conf.git)))
            .with_conductor(Conductor::new(compilers(&conf)))
            .with_builder(Box::new(OciImageBuilder::new(&conf.builder)))
            .with_drivers(Arc::new(drivers))
            .with_history_sink(Arc::new(JsonLinesHistorySink::stdout()))
            .with_time_limit(time_limit);

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling the running job");
                interrupt.cancel();
            }
        });

        let report = deployment_plan(time_limit).run(work_plan, cancel).await;
        eprint!("{}", TableRenderer::new().render_run_summary(&report));

        match report.error {
            None => {
                info!("Job finished in state {}", report.state);
                Ok(())
            }
            Some(error) => Err(anyhow::anyhow!(
                "Deployment failed at {} ({}): {}",
                report.failed_step.unwrap_or("unknown step"),
                error.code(),
                error
            )),
        }
    }
}

impl CompileCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let conf = load_engine_config(self.config.as_deref(), &self.properties)?;
        let job = JobUnit::from_json(&read_file(&self.job, "job")?)?;
        let manifest = read_file(&self.manifest, "manifest")?;

        let mut conductor = Conductor::new(compilers(&conf));
        conductor.configure(job);
        conductor.prepare(&manifest)?;
        let deployment = conductor.compile_deployment()?;

        println!("{}", TableRenderer::new().render_deployment(&deployment));
        Ok(())
    }
}

impl HistoryCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let job = JobUnit::from_json(&read_file(&self.job, "job")?)?;

        match job.history() {
            Some(history) => {
                println!("{}", TableRenderer::new().render_history(job.id(), history))
            }
            None => println!("No history recorded for job {}", job.id()),
        }
        Ok(())
    }
}
