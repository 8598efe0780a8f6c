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

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use paas_deploy::domain::config::CompilerConf;
    use paas_deploy::domain::deployment::CompiledDeployment;
    use paas_deploy::domain::job::{ClusterDefinition, ClusterKind, Identity, SourceRepository};
    use paas_deploy::domain::pipeline::recipe::{REPOSITORY_CLONING, WORKSPACE_PREPARING};
    use paas_deploy::domain::pipeline::steps::JOB_DEPLOYED;
    use paas_deploy::domain::pipeline::{
        ChannelHistorySink, CloningAgent, ClusterDriver, DriverDirectory, HistoryEvent,
        ImageBuilder, JobState, Workspace,
    };
    use paas_deploy::*;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio_util::sync::CancellationToken;

    const JOB: &str = r#"{
        "id": "job-9",
        "project": {"id": "shop", "name": "Shop"},
        "environment": {"name": "prod"},
        "source_repository": {"type": "git", "pull_url": "https://git.example.com/shop.git"},
        "images_repository": {"type": "registry", "api_url": "registry.test"},
        "clusters": [
            {"name": "eu-1", "type": "kubernetes", "address": "https://eu-1:6443", "environment": {"name": "prod"}},
            {"name": "eu-2", "type": "kubernetes", "address": "https://eu-2:6443", "environment": {"name": "prod"}}
        ]
    }"#;

    const MANIFEST: &str = r#"
paas.version: v1
images:
  php:
    path: docker/php
pods:
  app:
    containers:
      php:
        image: php
        listen: [9000]
services:
  app:
    ports:
      - listen: 9000
builds:
  dependencies:
    composer: install
"#;

    #[derive(Debug, Clone, Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }

        fn contains(&self, entry: &str) -> bool {
            self.entries().iter().any(|e| e == entry)
        }
    }

    #[derive(Debug)]
    struct FakeWorkspace {
        journal: Journal,
        manifest: String,
        job: Option<JobUnit>,
        clean_fails: bool,
    }

    #[async_trait]
    impl Workspace for FakeWorkspace {
        async fn set_job(&mut self, job: &JobUnit) -> Result<()> {
            self.journal.push("workspace.set_job");
            self.job = Some(job.clone());
            Ok(())
        }

        fn root(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/tmp/fake/job-9"))
        }

        fn checkout_path(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/tmp/fake/job-9/repository"))
        }

        async fn clean(&self) -> Result<()> {
            if self.clean_fails {
                return Err(PaasError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device busy",
                )));
            }
            self.journal.push("workspace.clean");
            Ok(())
        }

        async fn write_file(&self, _relative: &Path, _content: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn prepare_repository(&self, agent: &mut dyn CloningAgent) -> Result<()> {
            let job = self
                .job
                .as_ref()
                .ok_or_else(|| PaasError::contract("no job"))?;
            agent.configure(job.source_repository(), &self.checkout_path()?)?;
            agent.run().await
        }

        async fn load_deployment_into_conductor(&self, conductor: &mut Conductor) -> Result<()> {
            conductor.prepare(&self.manifest)
        }

        async fn run_in_root(&self, hook: &mut dyn Hook) -> Result<()> {
            hook.set_path(&self.checkout_path()?);
            hook.run().await
        }
    }

    #[derive(Debug)]
    struct FakeAgent {
        journal: Journal,
        fail: bool,
    }

    #[async_trait]
    impl CloningAgent for FakeAgent {
        fn configure(&mut self, repository: &SourceRepository, _destination: &Path) -> Result<()> {
            let SourceRepository::Git { pull_url, .. } = repository;
            self.journal.push(format!("agent.configure:{}", pull_url));
            Ok(())
        }

        async fn run(&self) -> Result<()> {
            if self.fail {
                return Err(PaasError::Clone("authentication failed".to_string()));
            }
            self.journal.push("agent.run");
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FakeBuilder {
        journal: Journal,
        registry: Option<String>,
    }

    #[async_trait]
    impl ImageBuilder for FakeBuilder {
        fn configure(&mut self, project_id: &str, url: &str, _auth: Option<&Identity>) -> Result<()> {
            self.registry = Some(format!("{}/{}", url, project_id));
            Ok(())
        }

        async fn build_images(
            &self,
            deployment: &mut CompiledDeployment,
            _working_path: &Path,
        ) -> Result<()> {
            let registry = self
                .registry
                .clone()
                .ok_or_else(|| PaasError::contract("builder not configured"))?;
            let bound: Vec<_> = deployment
                .buildables()
                .map(|b| b.with_registry(registry.clone()))
                .collect();
            for buildable in bound {
                self.journal.push(format!("builder.image:{}", buildable.reference()));
                deployment.update_buildable(buildable)?;
            }
            Ok(())
        }

        async fn build_volumes(
            &self,
            _deployment: &mut CompiledDeployment,
            _working_path: &Path,
        ) -> Result<()> {
            self.journal.push("builder.volumes");
            Ok(())
        }
    }

    #[derive(Debug)]
    struct FakeDriver {
        journal: Journal,
        failing_cluster: Option<String>,
        name: String,
    }

    #[async_trait]
    impl ClusterDriver for FakeDriver {
        async fn configure(&mut self, cluster: &ClusterDefinition) -> Result<()> {
            self.name = cluster.name.clone();
            self.journal.push(format!("driver.configure:{}", cluster.name));
            Ok(())
        }

        async fn deploy(&self, deployment: &CompiledDeployment) -> Result<()> {
            if self.failing_cluster.as_deref() == Some(self.name.as_str()) {
                return Err(PaasError::Kube("quota exceeded".to_string()));
            }
            for pod in deployment.pods() {
                let image = deployment.resolve_image(&pod.containers[0])?;
                self.journal
                    .push(format!("driver.deploy:{}:{}", self.name, image));
            }
            Ok(())
        }

        async fn expose(&self, _deployment: &CompiledDeployment) -> Result<()> {
            self.journal.push(format!("driver.expose:{}", self.name));
            Ok(())
        }
    }

    #[derive(Debug)]
    struct RecordingHook {
        journal: Journal,
        name: &'static str,
        outcome: Option<&'static str>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl Hook for RecordingHook {
        fn set_path(&mut self, _path: &Path) {}

        fn set_options(&mut self, _options: &serde_yaml::Value) -> Result<()> {
            Ok(())
        }

        async fn run(&self) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.journal.push(format!("hook.run:{}", self.name));
            match self.outcome {
                Some(message) => Err(PaasError::Build(message.to_string())),
                None => Ok(()),
            }
        }
    }

    struct Harness {
        journal: Journal,
        events: UnboundedReceiver<HistoryEvent>,
        plan: WorkPlan,
    }

    fn hook_registry(journal: &Journal) -> HookRegistry {
        let composer = journal.clone();
        let failing = journal.clone();
        let slow = journal.clone();
        HookRegistry::new()
            .with("composer", move || {
                Box::new(RecordingHook {
                    journal: composer.clone(),
                    name: "composer",
                    outcome: None,
                    delay: None,
                })
            })
            .with("lint", move || {
                Box::new(RecordingHook {
                    journal: failing.clone(),
                    name: "lint",
                    outcome: Some("lint errors"),
                    delay: None,
                })
            })
            .with("slow", move || {
                Box::new(RecordingHook {
                    journal: slow.clone(),
                    name: "slow",
                    outcome: None,
                    delay: Some(Duration::from_secs(5)),
                })
            })
    }

    fn harness(manifest: &str, clone_fails: bool, failing_cluster: Option<&str>) -> Harness {
        harness_with(manifest, clone_fails, failing_cluster, false)
    }

    fn harness_with(
        manifest: &str,
        clone_fails: bool,
        failing_cluster: Option<&str>,
        clean_fails: bool,
    ) -> Harness {
        let journal = Journal::default();
        let compilers = CompilerCollection::new(
            BTreeMap::new(),
            Arc::new(hook_registry(&journal)),
            CompilerConf::default(),
        );

        let driver_journal = journal.clone();
        let failing_cluster = failing_cluster.map(str::to_string);
        let drivers = DriverDirectory::new().with(ClusterKind::Kubernetes, move || {
            Box::new(FakeDriver {
                journal: driver_journal.clone(),
                failing_cluster: failing_cluster.clone(),
                name: String::new(),
            })
        });

        let (sink, events) = ChannelHistorySink::new();
        let plan = WorkPlan::new()
            .with_raw_job(JOB)
            .with_workspace(Box::new(FakeWorkspace {
                journal: journal.clone(),
                manifest: manifest.to_string(),
                job: None,
                clean_fails,
            }))
            .with_cloning_agent(Box::new(FakeAgent {
                journal: journal.clone(),
                fail: clone_fails,
            }))
            .with_conductor(Conductor::new(Arc::new(compilers)))
            .with_builder(Box::new(FakeBuilder {
                journal: journal.clone(),
                registry: None,
            }))
            .with_drivers(Arc::new(drivers))
            .with_history_sink(Arc::new(sink));

        Harness {
            journal,
            events,
            plan,
        }
    }

    fn drain(events: &mut UnboundedReceiver<HistoryEvent>) -> Vec<HistoryEvent> {
        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        received
    }

    #[tokio::test]
    async fn test_successful_run_reaches_done() {
        let Harness {
            journal,
            mut events,
            plan,
        } = harness(MANIFEST, false, None);

        let report = deployment_plan(Duration::from_secs(30))
            .run(plan, CancellationToken::new())
            .await;

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(report.state, JobState::Done);
        assert!(report.handlers_run.is_empty());

        let history = report.history.expect("final history");
        assert_eq!(history.message, JOB_DEPLOYED);
        assert!(history.is_final);

        let entries = journal.entries();
        let position = |entry: &str| entries.iter().position(|e| e == entry).unwrap();
        assert!(position("agent.run") < position("hook.run:composer"));
        assert!(position("hook.run:composer") < position("builder.image:registry.test/shop/php:latest"));
        assert!(
            position("driver.deploy:eu-1:registry.test/shop/php:latest")
                < position("driver.deploy:eu-2:registry.test/shop/php:latest")
        );
        assert!(position("driver.deploy:eu-2:registry.test/shop/php:latest") < position("driver.expose:eu-1"));
        assert!(journal.contains("workspace.clean"));

        let events = drain(&mut events);
        assert_eq!(events.first().map(|e| e.history.message.as_str()), Some(WORKSPACE_PREPARING));
        assert_eq!(events.last().map(|e| e.history.message.as_str()), Some(JOB_DEPLOYED));
        assert!(events.iter().all(|e| e.job_id == "job-9"));
        assert_eq!(events.iter().filter(|e| e.history.is_final).count(), 1);

        let job = report.job.expect("job");
        assert_eq!(job.history().map(History::depth), Some(events.len()));
    }

    #[tokio::test]
    async fn test_clean_failure_keeps_single_final_entry() {
        let Harness {
            journal,
            mut events,
            plan,
        } = harness_with(MANIFEST, false, None, true);

        let report = deployment_plan(Duration::from_secs(30))
            .run(plan, CancellationToken::new())
            .await;

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(report.failed_step, None);
        assert_eq!(report.state, JobState::Done);
        assert!(report.handlers_run.is_empty());
        assert_eq!(report.history.map(|h| h.message.clone()), Some(JOB_DEPLOYED.to_string()));
        assert!(!journal.contains("workspace.clean"));

        let finals: Vec<String> = drain(&mut events)
            .into_iter()
            .filter(|e| e.history.is_final)
            .map(|e| e.history.message.clone())
            .collect();
        assert_eq!(finals, vec![JOB_DEPLOYED.to_string()]);
    }

    #[tokio::test]
    async fn test_clone_failure_stops_before_compilation() {
        let Harness {
            journal,
            mut events,
            plan,
        } = harness(MANIFEST, true, None);

        let report = deployment_plan(Duration::from_secs(30))
            .run(plan, CancellationToken::new())
            .await;

        assert!(matches!(report.error, Some(PaasError::Clone(_))));
        assert_eq!(report.failed_step, Some("clone_repository"));
        assert!(report.state < JobState::DeploymentCompiled);
        assert_eq!(report.handlers_run, vec!["unset_time_limit", "dispatch_result"]);

        let history = report.history.expect("final history");
        assert!(history.is_final);
        assert_eq!(history.message, "paas.error.repository.clone");
        assert_eq!(history.extra["step"], "clone_repository");
        assert_eq!(history.extra["http_status"], 500);

        assert!(!journal.contains("hook.run:composer"));
        assert!(!journal.contains("workspace.clean"));

        let messages: Vec<String> = drain(&mut events)
            .into_iter()
            .map(|e| e.history.message.clone())
            .collect();
        assert_eq!(
            messages,
            vec![
                WORKSPACE_PREPARING.to_string(),
                REPOSITORY_CLONING.to_string(),
                "paas.error.repository.clone".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_driver_failure_aborts_remaining_clusters() {
        let Harness { journal, plan, .. } = harness(MANIFEST, false, Some("eu-2"));

        let report = deployment_plan(Duration::from_secs(30))
            .run(plan, CancellationToken::new())
            .await;

        match report.error {
            Some(PaasError::Driver { cluster, .. }) => assert_eq!(cluster, "eu-2"),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(report.failed_step, Some("deploying"));
        assert_eq!(report.state, JobState::ClusterClientConfigured);
        assert!(journal.contains("driver.deploy:eu-1:registry.test/shop/php:latest"));
        assert!(!journal.entries().iter().any(|e| e.starts_with("driver.expose")));
        assert_eq!(
            report.history.map(|h| h.message.clone()),
            Some("paas.error.cluster".to_string())
        );
    }

    #[tokio::test]
    async fn test_hook_failure_skips_remaining_hooks() {
        let manifest = r#"
paas.version: v1
builds:
  checks:
    lint: ~
  dependencies:
    composer: install
"#;
        let Harness { journal, plan, .. } = harness(manifest, false, None);

        let report = deployment_plan(Duration::from_secs(30))
            .run(plan, CancellationToken::new())
            .await;

        match report.error {
            Some(PaasError::Hook { hook, .. }) => assert_eq!(hook, "checks:lint"),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(journal.contains("hook.run:lint"));
        assert!(!journal.contains("hook.run:composer"));
        assert_eq!(report.state, JobState::DeploymentCompiled);
    }

    #[tokio::test]
    async fn test_cancelled_run_still_dispatches_result() {
        let Harness { journal, plan, .. } = harness(MANIFEST, false, None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = deployment_plan(Duration::from_secs(30)).run(plan, cancel).await;

        assert!(matches!(report.error, Some(PaasError::Cancelled)));
        assert_eq!(report.failed_step, Some("deserialize_job"));
        assert_eq!(report.state, JobState::Received);
        assert_eq!(report.handlers_run, vec!["unset_time_limit", "dispatch_result"]);
        assert_eq!(
            report.history.map(|h| h.message.clone()),
            Some("paas.error.cancelled".to_string())
        );
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_time_limit_interrupts_slow_step() {
        let manifest = r#"
paas.version: v1
builds:
  warmup:
    slow: ~
"#;
        let Harness { journal, plan, .. } = harness(manifest, false, None);
        let plan = plan.with_time_limit(Duration::from_millis(100));

        let report = deployment_plan(Duration::from_secs(30))
            .run(plan, CancellationToken::new())
            .await;

        assert!(matches!(report.error, Some(PaasError::Timeout(_))));
        assert_eq!(report.failed_step, Some("run_hooks"));
        assert!(!journal.contains("hook.run:slow"));

        let history = report.history.expect("final history");
        assert_eq!(history.message, "paas.error.timeout");
        assert_eq!(history.extra["http_status"], 408);
    }
}
