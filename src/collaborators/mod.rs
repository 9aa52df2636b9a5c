//! Narrow interfaces to the services a session talks to but does not own.

pub mod elevenlabs;
pub mod engagement;
pub mod tts;

pub use elevenlabs::ElevenLabsClient;
pub use engagement::{ActivityKind, EngagementHook, EngagementStage, LoggingEngagement};
pub use tts::{prepare_full_script, preprocess_text, TtsClient};

use std::path::PathBuf;

use serde::Serialize;

/// A rendered narration file, ready to be opened by an audio backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationAsset {
    pub path: PathBuf,
}
