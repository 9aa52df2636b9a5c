use thiserror::Error;

use crate::session::SessionStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The TTS collaborator rejected the request or could not be reached.
    #[error("narration generation failed: {0}")]
    Generation(String),
    /// The audio runtime refused to start playback. Never fatal for the visual timeline.
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
    #[error("narration metadata not loaded yet")]
    MetadataUnavailable,
    #[error("cannot {action} while session is {from:?}")]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },
    #[error("timeline has no phases")]
    EmptyTimeline,
    #[error("audio backend error: {0}")]
    Audio(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
