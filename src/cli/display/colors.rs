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

//! Color theme for CLI output

use crate::domain::pipeline::JobState;
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
    pub muted: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
            muted: TableColor::DarkGrey,
        }
    }
}

impl ColorTheme {
    /// Color of a History event: final events are green or red depending on
    /// the outcome, intermediate ones are informational.
    pub fn history_color(&self, is_final: bool, failed: bool) -> TableColor {
        match (is_final, failed) {
            (true, false) => self.success,
            (true, true) => self.error,
            (false, true) => self.warning,
            (false, false) => self.info,
        }
    }

    pub fn state_color(&self, state: JobState, failed: bool) -> TableColor {
        if failed {
            self.error
        } else if state == JobState::Done {
            self.success
        } else {
            self.warning
        }
    }

    /// Internal services stay muted, public ones stand out.
    pub fn exposure_color(&self, internal: bool) -> TableColor {
        if internal {
            self.muted
        } else {
            self.info
        }
    }
}

/// Name of a theme color as `colored` understands it, for text printed
/// outside a table (outcome and run summary lines).
pub fn table_color_to_colored_str(color: TableColor) -> &'static str {
    match color {
        TableColor::Green => "green",
        TableColor::Yellow => "yellow",
        TableColor::Red => "red",
        TableColor::Cyan => "cyan",
        TableColor::DarkGrey => "bright black",
        _ => "white",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_theme() {
        let theme = ColorTheme::default();
        assert_eq!(theme.success, TableColor::Green);
        assert_eq!(theme.warning, TableColor::Yellow);
        assert_eq!(theme.error, TableColor::Red);
    }

    #[test]
    fn test_history_color() {
        let theme = ColorTheme::default();
        assert_eq!(theme.history_color(true, false), TableColor::Green);
        assert_eq!(theme.history_color(true, true), TableColor::Red);
        assert_eq!(theme.history_color(false, false), TableColor::Cyan);
    }

    #[test]
    fn test_state_color() {
        let theme = ColorTheme::default();
        assert_eq!(theme.state_color(JobState::Done, false), TableColor::Green);
        assert_eq!(theme.state_color(JobState::Deployed, false), TableColor::Yellow);
        assert_eq!(theme.state_color(JobState::Done, true), TableColor::Red);
        assert_eq!(table_color_to_colored_str(TableColor::DarkGrey), "bright black");
    }
}
