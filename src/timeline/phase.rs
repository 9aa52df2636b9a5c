use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    Intro,
    Body,
    WholeBody,
    Closing,
    Inhale,
    HoldIn,
    Exhale,
    HoldOut,
    /// One fixed block of a scripted journey.
    Block,
    Affirmation,
}

/// A named segment of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration_secs: f64,
    pub ordinal: usize,
    /// Index into the session's focus sequence for per-item phases.
    pub item_index: Option<usize>,
}

/// Ordered phases with a cumulative start-offset table. Built once per session.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    phases: Vec<Phase>,
    starts: Vec<f64>,
    total_secs: f64,
}

impl Timeline {
    pub fn builder() -> TimelineBuilder {
        TimelineBuilder::default()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn phase(&self, ordinal: usize) -> Option<&Phase> {
        self.phases.get(ordinal)
    }

    pub fn start_of(&self, ordinal: usize) -> Option<f64> {
        self.starts.get(ordinal).copied()
    }

    pub fn last(&self) -> &Phase {
        // Construction rejects empty timelines.
        &self.phases[self.phases.len() - 1]
    }

    /// Ordinal of the phase containing `elapsed`, clamped to the last phase.
    pub fn ordinal_at(&self, elapsed: f64) -> usize {
        let elapsed = sanitize(elapsed);
        // Number of phases that have started at or before `elapsed`.
        let started = self.starts.partition_point(|start| *start <= elapsed);
        started.saturating_sub(1).min(self.phases.len() - 1)
    }

    /// Ordinal of the first phase belonging to `item_index`.
    pub fn ordinal_for_item(&self, item_index: usize) -> Option<usize> {
        self.phases
            .iter()
            .position(|phase| phase.item_index == Some(item_index))
    }

    pub fn first_of_kind(&self, kind: PhaseKind) -> Option<usize> {
        self.phases.iter().position(|phase| phase.kind == kind)
    }

    /// Number of phases of `kind` entered at or before `elapsed`.
    pub fn entries_of(&self, kind: PhaseKind, elapsed: f64) -> u32 {
        let current = self.ordinal_at(elapsed);
        self.phases[..=current]
            .iter()
            .filter(|phase| phase.kind == kind)
            .count() as u32
    }
}

pub(crate) fn sanitize(elapsed: f64) -> f64 {
    if elapsed.is_finite() && elapsed > 0.0 {
        elapsed
    } else {
        0.0
    }
}

#[derive(Debug, Default)]
pub struct TimelineBuilder {
    phases: Vec<Phase>,
}

impl TimelineBuilder {
    pub fn phase(mut self, kind: PhaseKind, duration_secs: f64) -> Self {
        self.push(kind, duration_secs, None);
        self
    }

    pub fn item_phase(mut self, kind: PhaseKind, duration_secs: f64, item_index: usize) -> Self {
        self.push(kind, duration_secs, Some(item_index));
        self
    }

    fn push(&mut self, kind: PhaseKind, duration_secs: f64, item_index: Option<usize>) {
        self.phases.push(Phase {
            kind,
            duration_secs: duration_secs.max(0.0),
            ordinal: self.phases.len(),
            item_index,
        });
    }

    pub fn build(self) -> SessionResult<Timeline> {
        if self.phases.is_empty() {
            return Err(SessionError::EmptyTimeline);
        }
        let mut starts = Vec::with_capacity(self.phases.len());
        let mut cursor = 0.0;
        for phase in &self.phases {
            starts.push(cursor);
            cursor += phase.duration_secs;
        }
        Ok(Timeline {
            phases: self.phases,
            starts,
            total_secs: cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Timeline {
        Timeline::builder()
            .phase(PhaseKind::Intro, 15.0)
            .item_phase(PhaseKind::Body, 35.0, 0)
            .item_phase(PhaseKind::Body, 35.0, 1)
            .phase(PhaseKind::Closing, 20.0)
            .build()
            .unwrap()
    }

    #[test]
    fn totals_and_starts_follow_durations() {
        let timeline = sample();
        let sum: f64 = timeline.phases().iter().map(|p| p.duration_secs).sum();
        assert_eq!(timeline.total_secs(), sum);
        assert_eq!(timeline.start_of(2), Some(50.0));
        assert_eq!(timeline.ordinal_for_item(1), Some(2));
    }

    #[test]
    fn boundaries_belong_to_the_next_phase() {
        let timeline = sample();
        assert_eq!(timeline.ordinal_at(0.0), 0);
        assert_eq!(timeline.ordinal_at(14.99), 0);
        assert_eq!(timeline.ordinal_at(15.0), 1);
        assert_eq!(timeline.ordinal_at(105.0), 3);
        assert_eq!(timeline.ordinal_at(10_000.0), 3);
        assert_eq!(timeline.ordinal_at(f64::NAN), 0);
    }

    #[test]
    fn empty_builder_is_rejected() {
        assert_eq!(
            Timeline::builder().build().unwrap_err(),
            SessionError::EmptyTimeline
        );
    }

    #[test]
    fn zero_length_phases_are_skipped_over() {
        let timeline = Timeline::builder()
            .phase(PhaseKind::Intro, 0.0)
            .phase(PhaseKind::Closing, 5.0)
            .build()
            .unwrap();
        assert_eq!(timeline.ordinal_at(0.0), 1);
    }
}
