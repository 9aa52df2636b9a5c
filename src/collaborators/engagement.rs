use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    Meditation,
    Breathing,
    Affirmation,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EngagementStage {
    Start,
    Complete,
    Cancel,
}

/// Companion feedback. Fire-and-forget: implementations must not block and
/// have no way to fail the session.
pub trait EngagementHook: Send + Sync {
    fn notify(&self, kind: ActivityKind, stage: EngagementStage);
}

/// Default hook for headless runs; records the event in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEngagement;

impl EngagementHook for LoggingEngagement {
    fn notify(&self, kind: ActivityKind, stage: EngagementStage) {
        log::info!("engagement: {:?} {:?}", kind, stage);
    }
}
