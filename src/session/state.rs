use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::timeline::{PauseSnapshot, PhasePosition};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    /// Waiting on narration from the TTS service.
    Generating,
    Active,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    #[default]
    SelfPaced,
    Narrated,
}

/// The one authoritative record of where a session is. Only the controller
/// writes to it; everything shown to the user is derived from it.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub current_phase_ordinal: usize,
    pub elapsed_in_phase: f64,
    pub total_elapsed: f64,
    pub cycle: u32,
    pub paused_snapshot: Option<PauseSnapshot>,
    pub error: Option<String>,
}

impl SessionState {
    pub fn idle(mode: SessionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// A fresh record for a session that is about to start.
    pub fn begin(mode: SessionMode, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: Some(Uuid::new_v4().to_string()),
            started_at: Some(started_at),
            ..Self::idle(mode)
        }
    }

    /// Copies a scheduler projection into the record.
    pub fn apply(&mut self, position: &PhasePosition) {
        self.current_phase_ordinal = position.ordinal();
        self.elapsed_in_phase = position.offset_secs;
        self.total_elapsed = position.total_elapsed_secs;
        self.cycle = position.cycle;
    }

    /// Fails with `InvalidTransition` unless the status is one of `allowed`.
    pub fn require(&self, action: &'static str, allowed: &[SessionStatus]) -> SessionResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.status,
                action,
            })
        }
    }
}
