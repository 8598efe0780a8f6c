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

//! Table rendering for CLI output

use super::colors::table_color_to_colored_str;
use super::{ColorTheme, StatusIcon};
use crate::domain::deployment::{Buildable, CompiledDeployment, EnvValue, ImagePath, Volume};
use crate::domain::job::{History, JobUnit};
use crate::domain::pipeline::{JobState, RunReport};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, ContentArrangement, Table};

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|title| Cell::new(title).set_alignment(CellAlignment::Left))
                .collect::<Vec<_>>(),
        );
    table
}

fn section(output: &mut String, title: &str, count: usize, table: Table) {
    output.push_str(&format!(
        "╭─ {} {} ─╮\n",
        title,
        format!("[{}]", count).bright_black()
    ));
    output.push_str(&table.to_string());
    output.push('\n');
}

fn volume_kind(volume: &Volume) -> (&'static str, String) {
    match volume {
        Volume::Content(v) => (
            "content",
            v.image.clone().unwrap_or_else(|| {
                let paths: Vec<_> = v.paths.iter().map(|p| p.display().to_string()).collect();
                paths.join(", ")
            }),
        ),
        Volume::Persistent(v) => (
            "persistent",
            format!(
                "{} ({})",
                v.storage_size,
                v.storage_class.as_deref().unwrap_or("default")
            ),
        ),
        Volume::Secret(v) => ("secret", v.secret.clone()),
        Volume::Imported(v) => ("imported", v.from.clone()),
    }
}

impl TableRenderer {
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render every entity of a compiled deployment, one table per kind.
    /// Empty kinds are omitted.
    pub fn render_deployment(&self, deployment: &CompiledDeployment) -> String {
        let mut output = format!(
            "📦 Deployment {} (version {})\n",
            deployment.job_id().bold(),
            deployment.version()
        );

        let buildables: Vec<_> = deployment.buildables().collect();
        if !buildables.is_empty() {
            let mut images = table(&["IMAGE", "TAG", "KIND", "SOURCE"]);
            for buildable in &buildables {
                let (kind, source) = match buildable {
                    Buildable::Image(image) if image.library => {
                        ("library", image_path(&image.path))
                    }
                    Buildable::Image(image) => ("project", image_path(&image.path)),
                    Buildable::EmbeddedVolume(image) => ("embedded", image.original.clone()),
                };
                images.add_row(vec![
                    Cell::new(buildable.url()),
                    Cell::new(buildable.tag()),
                    Cell::new(kind),
                    Cell::new(source).fg(self.theme.muted),
                ]);
            }
            section(&mut output, "Images", buildables.len(), images);
        }

        let volumes: Vec<_> = deployment.volumes().collect();
        if !volumes.is_empty() {
            let mut rows = table(&["VOLUME", "KIND", "MOUNT", "SOURCE"]);
            for volume in &volumes {
                let (kind, source) = volume_kind(volume);
                rows.add_row(vec![
                    Cell::new(volume.name()),
                    Cell::new(kind),
                    Cell::new(volume.mount_path()),
                    Cell::new(source).fg(self.theme.muted),
                ]);
            }
            section(&mut output, "Volumes", volumes.len(), rows);
        }

        let pods: Vec<_> = deployment.pods().collect();
        if !pods.is_empty() {
            let mut rows = table(&["POD", "REPLICAS", "CONTAINER", "IMAGE", "VOLUMES", "ENV"]);
            for pod in &pods {
                for (index, container) in pod.containers.iter().enumerate() {
                    let image = deployment
                        .resolve_image(container)
                        .unwrap_or_else(|_| container.image.clone());
                    let volumes: Vec<String> = container
                        .volumes
                        .values()
                        .map(|v| format!("{}:{}", v.name(), v.mount_path()))
                        .collect();
                    let env: Vec<String> = container
                        .variables
                        .iter()
                        .map(|(name, value)| match value {
                            EnvValue::Plain(_) => name.clone(),
                            EnvValue::Secret(reference) => format!("{} ← {}", name, reference),
                        })
                        .collect();
                    let (pod_name, replicas) = if index == 0 {
                        (pod.name.clone(), pod.replicas.to_string())
                    } else {
                        (String::new(), String::new())
                    };
                    rows.add_row(vec![
                        Cell::new(pod_name),
                        Cell::new(replicas).set_alignment(CellAlignment::Center),
                        Cell::new(&container.name),
                        Cell::new(image),
                        Cell::new(volumes.join("\n")),
                        Cell::new(env.join("\n")).fg(self.theme.muted),
                    ]);
                }
            }
            section(&mut output, "Pods", pods.len(), rows);
        }

        let services: Vec<_> = deployment.services().collect();
        if !services.is_empty() {
            let mut rows = table(&["SERVICE", "POD", "PROTOCOL", "PORTS", "EXPOSURE"]);
            for service in &services {
                let ports: Vec<String> = service
                    .ports
                    .iter()
                    .map(|p| format!("{}→{}", p.listen, p.target))
                    .collect();
                let exposure = if service.internal { "internal" } else { "public" };
                rows.add_row(vec![
                    Cell::new(&service.name),
                    Cell::new(&service.pod),
                    Cell::new(service.protocol.as_str()),
                    Cell::new(ports.join(", ")),
                    Cell::new(exposure).fg(self.theme.exposure_color(service.internal)),
                ]);
            }
            section(&mut output, "Services", services.len(), rows);
        }

        let secrets: Vec<_> = deployment.secrets().collect();
        if !secrets.is_empty() {
            let mut rows = table(&["SECRET", "PROVIDER", "TYPE", "KEYS"]);
            for secret in &secrets {
                let keys: Vec<&str> = secret.options.keys().map(String::as_str).collect();
                rows.add_row(vec![
                    Cell::new(&secret.name),
                    Cell::new(&secret.provider),
                    Cell::new(&secret.kind),
                    Cell::new(keys.join(", ")).fg(self.theme.muted),
                ]);
            }
            section(&mut output, "Secrets", secrets.len(), rows);
        }

        let ingresses: Vec<_> = deployment.ingresses().collect();
        if !ingresses.is_empty() {
            let mut rows = table(&["INGRESS", "HOSTS", "ROUTES", "TLS"]);
            for ingress in &ingresses {
                let mut hosts = vec![ingress.host.clone()];
                hosts.extend(ingress.aliases.iter().cloned());
                let mut routes: Vec<String> = ingress
                    .paths
                    .iter()
                    .map(|p| format!("{} → {}:{}", p.path, p.backend.service, p.backend.port))
                    .collect();
                if let Some(backend) = &ingress.default_backend {
                    routes.push(format!("* → {}:{}", backend.service, backend.port));
                }
                rows.add_row(vec![
                    Cell::new(&ingress.name),
                    Cell::new(hosts.join("\n")),
                    Cell::new(routes.join("\n")),
                    Cell::new(ingress.tls_secret.as_deref().unwrap_or("-")),
                ]);
            }
            section(&mut output, "Ingresses", ingresses.len(), rows);
        }

        let hooks = deployment.hooks();
        if !hooks.is_empty() {
            let mut rows = table(&["#", "HOOK", "OPTIONS"]);
            for (index, hook) in hooks.iter().enumerate() {
                let options = serde_yaml::to_string(&hook.options)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                rows.add_row(vec![
                    Cell::new(index + 1),
                    Cell::new(&hook.name),
                    Cell::new(options).fg(self.theme.muted),
                ]);
            }
            section(&mut output, "Hooks", hooks.len(), rows);
        }

        output
    }

    /// Render a History chain from the oldest event to the newest.
    pub fn render_history(&self, job_id: &str, history: &History) -> String {
        let mut events: Vec<&History> = history.iter().collect();
        events.reverse();

        let mut rows = table(&["", "DATE", "MESSAGE", "DETAILS"]);
        for event in &events {
            let failed = StatusIcon::is_failure(event);
            let color = self.theme.history_color(event.is_final, failed);
            let details: Vec<String> = event
                .extra
                .iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => format!("{}: {}", key, s),
                    other => format!("{}: {}", key, other),
                })
                .collect();
            rows.add_row(vec![
                Cell::new(StatusIcon::history_icon(event)).fg(color),
                Cell::new(event.date.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::new(&event.message).fg(color),
                Cell::new(details.join("\n")).fg(Color::DarkGrey),
            ]);
        }

        let mut output = String::new();
        section(
            &mut output,
            &format!("History of {}", job_id),
            events.len(),
            rows,
        );
        if let Some(last) = events.last().filter(|event| event.is_final) {
            let success = !StatusIcon::is_failure(last);
            let color = self.theme.history_color(true, !success);
            let outcome = StatusIcon::outcome_text(success).color(table_color_to_colored_str(color));
            output.push_str(&format!("Outcome: {}\n", outcome));
        }
        output
    }

    /// One line summarizing a pipeline run, colored by the state it reached.
    pub fn render_run_summary(&self, report: &RunReport) -> String {
        let failed = !report.is_success();
        let icon = if failed {
            StatusIcon::ERROR
        } else if report.state == JobState::Done {
            StatusIcon::SUCCESS
        } else {
            StatusIcon::WARNING
        };
        let job_id = report.job.as_ref().map(JobUnit::id).unwrap_or("unknown");

        let mut line = format!(
            "{} Job {}: {} (state {})",
            icon,
            job_id,
            StatusIcon::outcome_text(!failed),
            report.state
        );
        if let (Some(step), Some(error)) = (report.failed_step, report.error.as_ref()) {
            line.push_str(&format!(" at {}: {}", step, error.code()));
        }

        let color = self.theme.state_color(report.state, failed);
        format!("{}\n", line.color(table_color_to_colored_str(color)))
    }
}

fn image_path(path: &ImagePath) -> String {
    match path {
        ImagePath::Library(p) | ImagePath::Workspace(p) => p.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::deployment::{Container, Pod, Protocol, Service, Transport};
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_deployment() {
        let mut deployment = CompiledDeployment::new("v1", "job-42");
        deployment
            .add_pod(Pod {
                name: "web".to_string(),
                replicas: 3,
                containers: vec![Container {
                    name: "nginx".to_string(),
                    image: "library/nginx".to_string(),
                    version: "1.27".to_string(),
                    listen: vec![80],
                    volumes: BTreeMap::new(),
                    variables: BTreeMap::new(),
                }],
            })
            .unwrap();
        deployment
            .add_service(Service {
                name: "web".to_string(),
                pod: "web".to_string(),
                ports: vec![Transport {
                    listen: 80,
                    target: 8080,
                }],
                protocol: Protocol::Tcp,
                internal: true,
            })
            .unwrap();

        let output = TableRenderer::new().render_deployment(&deployment);
        assert!(output.contains("job-42"));
        assert!(output.contains("library/nginx:1.27"));
        assert!(output.contains("80→8080"));
        assert!(!output.contains("Ingresses"));
    }

    #[test]
    fn test_render_history_oldest_first() {
        let first = History::new("paas.job.workspace.preparing", Utc::now());
        let last = History::new("paas.job.deployed", Utc::now())
            .finalized()
            .chained_to(Some(&first));

        let output = TableRenderer::new().render_history("job-42", &last);
        let preparing = output.find("paas.job.workspace.preparing").unwrap();
        let deployed = output.find("paas.job.deployed").unwrap();
        assert!(preparing < deployed);
        assert!(output.contains("Outcome"));
    }

    #[test]
    fn test_render_run_summary() {
        colored::control::set_override(false);
        let renderer = TableRenderer::new();

        let done = RunReport {
            state: JobState::Done,
            failed_step: None,
            error: None,
            handlers_run: Vec::new(),
            history: None,
            job: None,
        };
        let output = renderer.render_run_summary(&done);
        assert!(output.starts_with(StatusIcon::SUCCESS));
        assert!(output.contains("Deployed (state done)"));

        let failed = RunReport {
            state: JobState::WorkspacePrepared,
            failed_step: Some("clone_repository"),
            error: Some(crate::shared::error::PaasError::Clone("no route".to_string())),
            handlers_run: vec!["unset_time_limit", "dispatch_result"],
            history: None,
            job: None,
        };
        let output = renderer.render_run_summary(&failed);
        assert!(output.starts_with(StatusIcon::ERROR));
        assert!(output.contains("at clone_repository: paas.error.repository.clone"));
    }
}
