use serde::{Deserialize, Serialize};

use super::phase::{PhaseKind, Timeline};
use super::scheduler::PhasePosition;

/// How a paused session finds its way back onto the timeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ResumeStrategy {
    /// Re-project the stored total elapsed time.
    #[default]
    Snapshot,
    /// Rebuild the phase from the phase-local counter and the current item index.
    /// Kept for parity with older builds; lands in the wrong phase for some pause
    /// points (see the tests below).
    LegacyHeuristic,
}

/// Captured at pause time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseSnapshot {
    pub total_elapsed_secs: f64,
    pub phase_local_secs: f64,
    pub ordinal: usize,
}

impl PauseSnapshot {
    pub fn capture(position: &PhasePosition) -> Self {
        Self {
            total_elapsed_secs: position.total_elapsed_secs,
            phase_local_secs: position.offset_secs,
            ordinal: position.ordinal(),
        }
    }
}

/// Total elapsed time to continue from after a resume.
pub fn resume_elapsed(strategy: ResumeStrategy, timeline: &Timeline, snapshot: &PauseSnapshot) -> f64 {
    match strategy {
        ResumeStrategy::Snapshot => snapshot.total_elapsed_secs,
        ResumeStrategy::LegacyHeuristic => {
            legacy_resume(timeline, snapshot).unwrap_or(snapshot.total_elapsed_secs)
        }
    }
}

/// The old body-scan rule: intro if still on the first item with less than 18s
/// in the phase, otherwise the body phase of the current item, otherwise
/// whole-body below 25s, otherwise closing. The phase-local counter is then
/// replayed inside whichever phase was picked.
///
/// Returns `None` for timelines without an intro, which never used this rule.
pub fn legacy_resume(timeline: &Timeline, snapshot: &PauseSnapshot) -> Option<f64> {
    let intro = timeline.first_of_kind(PhaseKind::Intro)?;
    let local = snapshot.phase_local_secs.max(0.0);

    // The old counter kept pointing at the last visited item once the scan
    // moved past the body phases.
    let item_index = timeline.phases()[..=snapshot.ordinal.min(timeline.len() - 1)]
        .iter()
        .rev()
        .find_map(|phase| (phase.kind == PhaseKind::Body).then_some(phase.item_index).flatten())
        .unwrap_or(0);
    let item_count = timeline
        .phases()
        .iter()
        .filter(|phase| phase.kind == PhaseKind::Body)
        .count();

    let target = if item_index == 0 && local < 18.0 {
        intro
    } else if item_index < item_count {
        timeline.ordinal_for_item(item_index)?
    } else if local < 25.0 {
        timeline.first_of_kind(PhaseKind::WholeBody)?
    } else {
        timeline.first_of_kind(PhaseKind::Closing)?
    };

    let start = timeline.start_of(target)?;
    let duration = timeline.phase(target)?.duration_secs;
    Some(start + local.min(duration))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::script::{ScriptBank, ScriptKind, ScriptResolver};
    use crate::sequence::{FocusCategory, FocusItem};
    use crate::timeline::presets::{body_scan, box_breathing, BodyScanDurations};
    use crate::timeline::scheduler::PhaseScheduler;

    fn scan(parts: usize) -> PhaseScheduler {
        PhaseScheduler::new(Arc::new(
            body_scan(parts, BodyScanDurations::SELF_PACED).unwrap(),
        ))
    }

    fn round_trip(scheduler: &PhaseScheduler, strategy: ResumeStrategy, at: f64) -> PhasePosition {
        let before = scheduler.phase_at(at);
        let snapshot = PauseSnapshot::capture(&before);
        scheduler.phase_at(resume_elapsed(strategy, scheduler.timeline(), &snapshot))
    }

    #[test]
    fn snapshot_resume_is_exact_everywhere() {
        let scheduler = scan(3);
        let items = vec![
            FocusItem::new("left hand", FocusCategory::Upper),
            FocusItem::new("right knee", FocusCategory::Lower),
            FocusItem::new("forehead", FocusCategory::Head),
        ];
        let resolver = ScriptResolver::new(ScriptKind::BodyScan, ScriptBank::SelfPaced, items.len());
        let total = scheduler.total_secs() as u32;
        for second in 0..total {
            let at = f64::from(second) + 0.5;
            let before = scheduler.phase_at(at);
            let resumed = round_trip(&scheduler, ResumeStrategy::Snapshot, at);
            assert_eq!(resumed, before);
            assert_eq!(
                resolver.text_at(&resumed, &items),
                resolver.text_at(&before, &items),
                "text changed across pause at {at}s"
            );
        }
    }

    #[test]
    fn legacy_agrees_inside_intro_and_later_body_parts() {
        let scheduler = scan(3);
        // Intro, 10s in.
        assert_eq!(
            round_trip(&scheduler, ResumeStrategy::LegacyHeuristic, 10.0),
            scheduler.phase_at(10.0)
        );
        // Second body part, 20s in.
        let at = 15.0 + 35.0 + 20.0;
        assert_eq!(
            round_trip(&scheduler, ResumeStrategy::LegacyHeuristic, at),
            scheduler.phase_at(at)
        );
    }

    // Pins current legacy behavior: pausing early in the first body part sends
    // the session back into the intro.
    #[test]
    fn legacy_rewinds_first_body_part_into_intro() {
        let scheduler = scan(3);
        let at = 15.0 + 10.0;
        let resumed = round_trip(&scheduler, ResumeStrategy::LegacyHeuristic, at);
        assert_eq!(resumed.phase.kind, PhaseKind::Intro);
        assert_eq!(resumed.offset_secs, 10.0);
        assert_eq!(scheduler.phase_at(at).phase.kind, PhaseKind::Body);
    }

    // Pins current legacy behavior: the item counter never passes the last part,
    // so whole-body and closing resume into the last body part.
    #[test]
    fn legacy_rewinds_whole_body_into_last_part() {
        let scheduler = scan(3);
        let whole_body_start = 15.0 + 3.0 * 35.0;
        let resumed = round_trip(
            &scheduler,
            ResumeStrategy::LegacyHeuristic,
            whole_body_start + 5.0,
        );
        assert_eq!(resumed.phase.kind, PhaseKind::Body);
        assert_eq!(resumed.phase.item_index, Some(2));
        assert_eq!(resumed.offset_secs, 5.0);

        let closing = round_trip(
            &scheduler,
            ResumeStrategy::LegacyHeuristic,
            whole_body_start + 20.0 + 3.0,
        );
        assert_eq!(closing.phase.kind, PhaseKind::Body);
    }

    #[test]
    fn legacy_overlong_intro_counter_spills_into_first_part() {
        let scheduler = scan(2);
        let snapshot = PauseSnapshot {
            total_elapsed_secs: 14.0,
            phase_local_secs: 17.0,
            ordinal: 0,
        };
        let resumed = scheduler.phase_at(resume_elapsed(
            ResumeStrategy::LegacyHeuristic,
            scheduler.timeline(),
            &snapshot,
        ));
        assert_eq!(resumed.phase.kind, PhaseKind::Body);
        assert_eq!(resumed.offset_secs, 0.0);
    }

    #[test]
    fn legacy_falls_back_to_snapshot_without_intro() {
        let timeline = box_breathing(4.0, 2).unwrap();
        let snapshot = PauseSnapshot {
            total_elapsed_secs: 9.0,
            phase_local_secs: 1.0,
            ordinal: 2,
        };
        assert_eq!(legacy_resume(&timeline, &snapshot), None);
        assert_eq!(
            resume_elapsed(ResumeStrategy::LegacyHeuristic, &timeline, &snapshot),
            9.0
        );
    }
}
