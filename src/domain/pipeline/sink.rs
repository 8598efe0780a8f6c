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
use crate::domain::pipeline::contracts::HistorySink;
use crate::shared::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// An event as streamed to a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    pub job_id: String,
    pub history: History,
}

/// Streams every event into a channel, e.g. for a caller following a run.
#[derive(Debug, Clone)]
pub struct ChannelHistorySink {
    sender: mpsc::UnboundedSender<HistoryEvent>,
}

impl ChannelHistorySink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HistoryEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl HistorySink for ChannelHistorySink {
    async fn dispatch(&self, job_id: &str, history: &History) -> Result<()> {
        // Send the event without its chain; receivers see every node anyway.
        let mut event = History::new(history.message.clone(), history.date)
            .with_extra(history.extra.clone());
        event.is_final = history.is_final;

        let sent = self.sender.send(HistoryEvent {
            job_id: job_id.to_string(),
            history: event,
        });
        // A departed observer must not abort the deployment.
        if sent.is_err() {
            warn!(job_id = %job_id, message = %history.message, "history receiver is closed");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogHistorySink;

#[async_trait]
impl HistorySink for LogHistorySink {
    async fn dispatch(&self, job_id: &str, history: &History) -> Result<()> {
        info!(
            job_id = %job_id,
            message = %history.message,
            is_final = history.is_final,
            "history"
        );
        Ok(())
    }
}
