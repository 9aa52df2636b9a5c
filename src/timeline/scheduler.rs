use std::sync::Arc;

use serde::Serialize;

use super::phase::{sanitize, Phase, PhaseKind, Timeline};

/// Where a given elapsed time lands on a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasePosition {
    pub phase: Phase,
    pub offset_secs: f64,
    pub total_elapsed_secs: f64,
    /// Inhale entries so far; zero for timelines without breathing phases.
    pub cycle: u32,
    pub completed: bool,
}

impl PhasePosition {
    pub fn ordinal(&self) -> usize {
        self.phase.ordinal
    }
}

/// Projects elapsed session time onto a [`Timeline`].
///
/// All state lives in `total_elapsed`; the phase is always derived from it.
#[derive(Debug, Clone)]
pub struct PhaseScheduler {
    timeline: Arc<Timeline>,
    total_elapsed: f64,
}

impl PhaseScheduler {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        Self {
            timeline,
            total_elapsed: 0.0,
        }
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }

    pub fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }

    pub fn total_secs(&self) -> f64 {
        self.timeline.total_secs()
    }

    /// Pure projection: same input, same output, no counters touched.
    pub fn phase_at(&self, elapsed_secs: f64) -> PhasePosition {
        let elapsed = sanitize(elapsed_secs);
        let total = self.timeline.total_secs();

        if elapsed >= total {
            let last = *self.timeline.last();
            return PhasePosition {
                phase: last,
                offset_secs: last.duration_secs,
                total_elapsed_secs: total,
                cycle: self.timeline.entries_of(PhaseKind::Inhale, total),
                completed: true,
            };
        }

        let ordinal = self.timeline.ordinal_at(elapsed);
        let phase = self.timeline.phases()[ordinal];
        let start = self.timeline.start_of(ordinal).unwrap_or(0.0);
        PhasePosition {
            phase,
            offset_secs: elapsed - start,
            total_elapsed_secs: elapsed,
            cycle: self.timeline.entries_of(PhaseKind::Inhale, elapsed),
            completed: false,
        }
    }

    /// Moves to an absolute elapsed time. Used by both tick sources.
    pub fn seek(&mut self, elapsed_secs: f64) -> PhasePosition {
        self.total_elapsed = sanitize(elapsed_secs);
        self.phase_at(self.total_elapsed)
    }

    pub fn advance(&mut self, delta_secs: f64) -> PhasePosition {
        self.seek(self.total_elapsed + sanitize(delta_secs))
    }

    pub fn current(&self) -> PhasePosition {
        self.phase_at(self.total_elapsed)
    }

    /// Progress through the timeline in `[0, 100]`.
    pub fn progress_percent(&self, elapsed_secs: f64) -> f64 {
        let total = self.timeline.total_secs();
        if total <= 0.0 {
            return 0.0;
        }
        (sanitize(elapsed_secs) / total * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::presets::box_breathing;

    fn scan() -> PhaseScheduler {
        let timeline = Timeline::builder()
            .phase(PhaseKind::Intro, 15.0)
            .item_phase(PhaseKind::Body, 35.0, 0)
            .item_phase(PhaseKind::Body, 35.0, 1)
            .phase(PhaseKind::WholeBody, 20.0)
            .phase(PhaseKind::Closing, 20.0)
            .build()
            .unwrap();
        PhaseScheduler::new(Arc::new(timeline))
    }

    #[test]
    fn phase_at_is_pure() {
        let scheduler = scan();
        for tenth in 0..=1250 {
            let t = f64::from(tenth) / 10.0;
            assert_eq!(scheduler.phase_at(t), scheduler.phase_at(t));
        }
        assert_eq!(scheduler.total_elapsed(), 0.0);
    }

    #[test]
    fn ordinal_never_regresses() {
        let scheduler = scan();
        let mut last = 0;
        for second in 0..=130 {
            let ordinal = scheduler.phase_at(f64::from(second)).ordinal();
            assert!(ordinal >= last, "regressed at {second}s");
            last = ordinal;
        }
    }

    #[test]
    fn offset_is_relative_to_phase_start() {
        let scheduler = scan();
        let position = scheduler.phase_at(57.5);
        assert_eq!(position.phase.kind, PhaseKind::Body);
        assert_eq!(position.phase.item_index, Some(1));
        assert_eq!(position.offset_secs, 7.5);
        assert!(!position.completed);
    }

    #[test]
    fn exhaustion_reports_final_phase_completed() {
        let scheduler = scan();
        let position = scheduler.phase_at(125.0);
        assert!(position.completed);
        assert_eq!(position.phase.kind, PhaseKind::Closing);
        assert_eq!(position.total_elapsed_secs, 125.0);
        assert!(scheduler.phase_at(500.0).completed);
    }

    #[test]
    fn advance_recomputes_from_total() {
        let mut scheduler = scan();
        scheduler.advance(10.0);
        let position = scheduler.advance(10.0);
        assert_eq!(position.phase.kind, PhaseKind::Body);
        assert_eq!(position.offset_secs, 5.0);
        assert_eq!(position, scheduler.phase_at(20.0));
    }

    #[test]
    fn box_breathing_cycle_counts_inhale_entries() {
        let scheduler = PhaseScheduler::new(Arc::new(box_breathing(4.0, 4).unwrap()));
        let position = scheduler.phase_at(20.0);
        assert_eq!(position.phase.kind, PhaseKind::Inhale);
        assert_eq!(position.cycle, 2);
        assert_eq!(scheduler.phase_at(15.9).cycle, 1);
        assert_eq!(scheduler.phase_at(15.9).phase.kind, PhaseKind::HoldOut);
    }

    #[test]
    fn progress_is_clamped() {
        let scheduler = scan();
        assert_eq!(scheduler.progress_percent(0.0), 0.0);
        assert_eq!(scheduler.progress_percent(62.5), 50.0);
        assert_eq!(scheduler.progress_percent(1_000.0), 100.0);
    }
}
