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

use crate::domain::job::History;
use crate::domain::pipeline::HistorySink;
use crate::shared::error::Result;
use async_trait::async_trait;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Writes one JSON document per History event, without the chain.
#[derive(Debug, Clone)]
pub struct JsonLinesHistorySink<W: Write + Send> {
    writer: Arc<Mutex<W>>,
}

impl JsonLinesHistorySink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesHistorySink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub fn writer(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.writer)
    }
}

pub fn event_line(job_id: &str, history: &History) -> Result<String> {
    let line = json!({
        "job_id": job_id,
        "message": history.message,
        "date": history.date,
        "is_final": history.is_final,
        "extra": history.extra,
    });
    Ok(serde_json::to_string(&line)?)
}

#[async_trait]
impl<W: Write + Send + std::fmt::Debug + 'static> HistorySink for JsonLinesHistorySink<W> {
    async fn dispatch(&self, job_id: &str, history: &History) -> Result<()> {
        let line = event_line(job_id, history)?;
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_one_line_per_event() {
        let sink = JsonLinesHistorySink::new(Vec::new());
        let date = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let first = History::new("paas.job.workspace.preparing", date);
        let second = History::new("paas.job.deployed", date)
            .finalized()
            .chained_to(Some(&first));

        sink.dispatch("job-1", &first).await.unwrap();
        sink.dispatch("job-1", &second).await.unwrap();

        let written = sink.writer();
        let buffer = written.lock().unwrap();
        let output = String::from_utf8(buffer.clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"is_final\":true"));
        assert!(!lines[1].contains("previous"));
    }
}
