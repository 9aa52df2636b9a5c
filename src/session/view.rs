use std::collections::VecDeque;

use serde::Serialize;

use crate::timeline::PhaseKind;

use super::{SessionMode, SessionStatus};

/// Lines kept for scrolling displays.
pub const HISTORY_LIMIT: usize = 10;

pub const GENERATING_TEXT: &str = "Preparing your session...";

/// Everything a presentation layer needs, recomputed from the session state on
/// every change.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub status: SessionStatus,
    pub mode: SessionMode,
    pub progress_percent: f64,
    pub current_text: String,
    pub current_focus_item: Option<String>,
    pub elapsed_formatted: String,
    pub phase: Option<PhaseKind>,
    pub cycle: u32,
    pub feeling_better: bool,
    pub error: Option<String>,
    pub script_history: Vec<String>,
}

/// The last [`HISTORY_LIMIT`] lines shown, without consecutive repeats.
#[derive(Debug, Clone, Default)]
pub struct ScriptHistory {
    lines: VecDeque<String>,
}

impl ScriptHistory {
    pub fn push(&mut self, line: &str) {
        if line.is_empty() || self.lines.back().is_some_and(|last| last == line) {
            return;
        }
        if self.lines.len() == HISTORY_LIMIT {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}
