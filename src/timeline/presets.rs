use crate::error::{SessionError, SessionResult};
use crate::sequence::pools::RELEASE_BLOCKS;

use super::phase::{PhaseKind, Timeline, TimelineBuilder};

/// Seconds per affirmation line.
pub const AFFIRMATION_SECS: f64 = 10.0;

/// Length of the fixed spoken welcome that opens every rendered narration.
pub const SPOKEN_INTRO_SECS: f64 = 12.0;
/// Length of the fixed spoken farewell that ends every rendered narration.
pub const SPOKEN_CLOSING_SECS: f64 = 12.0;

/// Whether a scripted timeline is wrapped in the spoken welcome and farewell.
/// Rendered narration always carries both, so the visual timeline has to
/// account for them or it runs ahead of the voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Bare,
    Spoken,
}

impl Framing {
    fn open(self, builder: TimelineBuilder) -> TimelineBuilder {
        match self {
            Framing::Bare => builder,
            Framing::Spoken => builder.phase(PhaseKind::Intro, SPOKEN_INTRO_SECS),
        }
    }

    fn close(self, builder: TimelineBuilder) -> TimelineBuilder {
        match self {
            Framing::Bare => builder,
            Framing::Spoken => builder.phase(PhaseKind::Closing, SPOKEN_CLOSING_SECS),
        }
    }
}

/// Segment lengths of a body scan. Narrated audio is rendered at a different pace
/// than the self-paced reading, so each mode has its own table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyScanDurations {
    pub intro: f64,
    pub part: f64,
    pub whole_body: f64,
    pub closing: f64,
}

impl BodyScanDurations {
    pub const SELF_PACED: Self = Self {
        intro: 15.0,
        part: 35.0,
        whole_body: 20.0,
        closing: 20.0,
    };

    pub const NARRATED: Self = Self {
        intro: SPOKEN_INTRO_SECS,
        part: 25.0,
        whole_body: 15.0,
        closing: SPOKEN_CLOSING_SECS,
    };

    pub fn total(&self, parts: usize) -> f64 {
        self.intro + self.part * parts as f64 + self.whole_body + self.closing
    }
}

pub fn body_scan(parts: usize, durations: BodyScanDurations) -> SessionResult<Timeline> {
    let mut builder = Timeline::builder().phase(PhaseKind::Intro, durations.intro);
    for index in 0..parts {
        builder = builder.item_phase(PhaseKind::Body, durations.part, index);
    }
    builder
        .phase(PhaseKind::WholeBody, durations.whole_body)
        .phase(PhaseKind::Closing, durations.closing)
        .build()
}

/// `cycles` rounds of inhale, hold, exhale, hold.
pub fn box_breathing(phase_secs: f64, cycles: u32) -> SessionResult<Timeline> {
    let mut builder = Timeline::builder();
    for _ in 0..cycles {
        builder = builder
            .phase(PhaseKind::Inhale, phase_secs)
            .phase(PhaseKind::HoldIn, phase_secs)
            .phase(PhaseKind::Exhale, phase_secs)
            .phase(PhaseKind::HoldOut, phase_secs);
    }
    builder.build()
}

pub fn release_journey(framing: Framing) -> SessionResult<Timeline> {
    let builder = RELEASE_BLOCKS.iter().enumerate().fold(
        framing.open(Timeline::builder()),
        |builder, (index, (_, secs))| builder.item_phase(PhaseKind::Block, f64::from(*secs), index),
    );
    framing.close(builder).build()
}

/// One phase per line. No lines is an error even when framed.
pub fn affirmation_loop(lines: usize, framing: Framing) -> SessionResult<Timeline> {
    if lines == 0 {
        return Err(SessionError::EmptyTimeline);
    }
    let builder = (0..lines).fold(framing.open(Timeline::builder()), |builder, index| {
        builder.item_phase(PhaseKind::Affirmation, AFFIRMATION_SECS, index)
    });
    framing.close(builder).build()
}
