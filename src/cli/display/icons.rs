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

//! Status icons for CLI output

use crate::domain::job::History;

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    pub const SUCCESS: &'static str = "✓";

    pub const WARNING: &'static str = "⚠";

    pub const ERROR: &'static str = "✗";

    /// Intermediate pipeline event
    pub const PENDING: &'static str = "⏳";

    /// Icon of one History event
    pub fn history_icon(history: &History) -> &'static str {
        match (history.is_final, Self::is_failure(history)) {
            (true, false) => Self::SUCCESS,
            (true, true) => Self::ERROR,
            (false, true) => Self::WARNING,
            (false, false) => Self::PENDING,
        }
    }

    /// Failure events carry the error message in their extra data.
    pub fn is_failure(history: &History) -> bool {
        history.extra.contains_key("error")
    }

    pub fn outcome_text(success: bool) -> &'static str {
        if success {
            "Deployed"
        } else {
            "Failed"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Map};

    #[test]
    fn test_history_icon() {
        let step = History::new("paas.job.deploying", Utc::now());
        assert_eq!(StatusIcon::history_icon(&step), StatusIcon::PENDING);

        let done = History::new("paas.job.deployed", Utc::now()).finalized();
        assert_eq!(StatusIcon::history_icon(&done), StatusIcon::SUCCESS);

        let mut extra = Map::new();
        extra.insert("error".to_string(), json!("boom"));
        let failed = History::new("paas.error.build", Utc::now())
            .with_extra(extra)
            .finalized();
        assert_eq!(StatusIcon::history_icon(&failed), StatusIcon::ERROR);
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(StatusIcon::outcome_text(true), "Deployed");
        assert_eq!(StatusIcon::outcome_text(false), "Failed");
    }
}
