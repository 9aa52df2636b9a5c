use serde::Serialize;

use crate::audio::NarrationPosition;
use crate::collaborators::NarrationAsset;
use crate::error::{SessionError, SessionResult};
use crate::timeline::{PhasePosition, PhaseScheduler};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

/// What is known about the narration track. The duration stays `None` until the
/// transport has read the track's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationTrack {
    pub asset: NarrationAsset,
    pub duration_secs: Option<f64>,
    pub current_position_secs: f64,
}

impl NarrationTrack {
    pub fn new(asset: NarrationAsset) -> Self {
        Self {
            asset,
            duration_secs: None,
            current_position_secs: 0.0,
        }
    }

    /// Usable duration, or `MetadataUnavailable` while unknown, zero or not finite.
    pub fn duration(&self) -> SessionResult<f64> {
        match self.duration_secs {
            Some(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
            _ => Err(SessionError::MetadataUnavailable),
        }
    }
}

/// Keeps the visual timeline on the narration's clock. Every position update is
/// fed straight into the scheduler; nothing is counted locally.
#[derive(Debug, Clone)]
pub struct AudioSyncAdapter {
    track: NarrationTrack,
    completion_epsilon: f64,
    ended: bool,
}

impl AudioSyncAdapter {
    pub fn new(asset: NarrationAsset, completion_epsilon: f64) -> Self {
        Self {
            track: NarrationTrack::new(asset),
            completion_epsilon: completion_epsilon.max(0.0),
            ended: false,
        }
    }

    pub fn track(&self) -> &NarrationTrack {
        &self.track
    }

    /// Applies one report from the transport and re-projects the scheduler.
    pub fn update(
        &mut self,
        report: NarrationPosition,
        scheduler: &mut PhaseScheduler,
    ) -> PhasePosition {
        if self.track.duration_secs.is_none() {
            if let Some(secs) = report.duration_secs {
                log_info!("narration metadata loaded: {:.1}s", secs);
            }
        }
        if report.duration_secs.is_some() {
            self.track.duration_secs = report.duration_secs;
        }

        let position = if report.position_secs.is_finite() {
            report.position_secs.max(0.0)
        } else {
            0.0
        };
        self.track.current_position_secs = position;
        self.ended = report.ended;

        scheduler.seek(position)
    }

    /// Back to the top of the track, e.g. after a restart.
    pub fn rewind(&mut self, scheduler: &mut PhaseScheduler) -> PhasePosition {
        self.track.current_position_secs = 0.0;
        self.ended = false;
        scheduler.seek(0.0)
    }

    /// Share of the track played, in `[0, 100]`. Zero until the duration is known.
    pub fn progress_percent(&self) -> f64 {
        match self.track.duration() {
            Ok(duration) => (self.track.current_position_secs / duration * 100.0).clamp(0.0, 100.0),
            Err(_) => 0.0,
        }
    }

    /// True once the transport reports the end, or the position is within the
    /// completion epsilon of the known duration.
    pub fn is_complete(&self) -> bool {
        if self.ended {
            return true;
        }
        match self.track.duration() {
            Ok(duration) => self.track.current_position_secs >= duration - self.completion_epsilon,
            Err(_) => false,
        }
    }
}
