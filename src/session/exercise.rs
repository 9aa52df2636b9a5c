use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::collaborators::{prepare_full_script, ActivityKind};
use crate::error::{SessionError, SessionResult};
use crate::script::{body_scan, narration_body, ScriptBank, ScriptKind, ScriptResolver};
use crate::sequence::pools::{self, AffirmationTheme, PersonalAffirmation, RELEASE_BLOCKS};
use crate::sequence::{FocusItem, SequenceGenerator};
use crate::settings::GuidedSettings;
use crate::timeline::presets::{self, BodyScanDurations, Framing};
use crate::timeline::Timeline;

use super::SessionMode;

/// Lines drawn from a theme pool per affirmation session.
pub const AFFIRMATIONS_PER_SESSION: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Exercise {
    BodyScan,
    BoxBreathing,
    ReleasingMemories,
    Affirmations { theme: AffirmationTheme },
    PersonalAffirmations { affirmations: Vec<PersonalAffirmation> },
}

impl Exercise {
    pub fn activity(&self) -> ActivityKind {
        match self {
            Exercise::BodyScan | Exercise::ReleasingMemories => ActivityKind::Meditation,
            Exercise::BoxBreathing => ActivityKind::Breathing,
            Exercise::Affirmations { .. } | Exercise::PersonalAffirmations { .. } => {
                ActivityKind::Affirmation
            }
        }
    }

    pub fn script_kind(&self) -> ScriptKind {
        match self {
            Exercise::BodyScan => ScriptKind::BodyScan,
            Exercise::BoxBreathing => ScriptKind::BoxBreathing,
            _ => ScriptKind::Lines,
        }
    }

    /// Breathing is paced by on-screen cues only.
    pub fn supports_narration(&self) -> bool {
        !matches!(self, Exercise::BoxBreathing)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Exercise::BodyScan => body_scan::DESCRIPTION,
            Exercise::BoxBreathing => "Breathe in, hold, breathe out, hold. Four counts each, to steady the nervous system.",
            Exercise::ReleasingMemories => "A short guided journey to set down a memory that still weighs on you.",
            Exercise::Affirmations { theme } => match theme {
                AffirmationTheme::Calm => "Find peace and tranquility",
                AffirmationTheme::Confidence => "Build self-assurance and courage",
                AffirmationTheme::Healing => "Nurture restoration and recovery",
                AffirmationTheme::Clarity => "Gain focus and understanding",
                AffirmationTheme::Strength => "Cultivate resilience and power",
            },
            Exercise::PersonalAffirmations { .. } => "Your own custom affirmations",
        }
    }
}

/// Everything a session needs that is fixed at start: the focus sequence, the
/// timeline and the wording bank. Rebuilt from scratch on every start.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub exercise: Exercise,
    pub mode: SessionMode,
    pub items: Vec<FocusItem>,
    pub timeline: Arc<Timeline>,
    pub resolver: ScriptResolver,
}

impl SessionPlan {
    pub fn build<R: Rng>(
        exercise: &Exercise,
        mode: SessionMode,
        settings: &GuidedSettings,
        generator: &mut SequenceGenerator<R>,
    ) -> SessionResult<Self> {
        let framing = match mode {
            SessionMode::SelfPaced => Framing::Bare,
            SessionMode::Narrated => Framing::Spoken,
        };
        let (items, timeline) = match exercise {
            Exercise::BodyScan => {
                let range = settings.body_scan.min_items..=settings.body_scan.max_items;
                let items = generator.generate_in_range(&pools::body_parts(), range);
                let durations = match mode {
                    SessionMode::SelfPaced => BodyScanDurations::SELF_PACED,
                    SessionMode::Narrated => BodyScanDurations::NARRATED,
                };
                let timeline = presets::body_scan(items.len(), durations)?;
                (items, timeline)
            }
            Exercise::BoxBreathing => {
                let breathing = &settings.box_breathing;
                let timeline = presets::box_breathing(breathing.phase_secs, breathing.cycles)?;
                (Vec::new(), timeline)
            }
            Exercise::ReleasingMemories => {
                let items = RELEASE_BLOCKS
                    .iter()
                    .map(|(text, _)| FocusItem::line(*text))
                    .collect();
                (items, presets::release_journey(framing)?)
            }
            Exercise::Affirmations { theme } => {
                let items = generator.generate(&theme.pool(), AFFIRMATIONS_PER_SESSION);
                let timeline = presets::affirmation_loop(items.len(), framing)?;
                (items, timeline)
            }
            Exercise::PersonalAffirmations { affirmations } => {
                let items = pools::personal_lines(affirmations);
                let timeline = presets::affirmation_loop(items.len(), framing)?;
                (items, timeline)
            }
        };

        let bank = match mode {
            SessionMode::SelfPaced => ScriptBank::SelfPaced,
            SessionMode::Narrated => ScriptBank::Narrated,
        };
        let resolver = ScriptResolver::new(exercise.script_kind(), bank, items.len());

        Ok(Self {
            exercise: exercise.clone(),
            mode,
            items,
            timeline: Arc::new(timeline),
            resolver,
        })
    }

    /// The complete text sent for narration, intro and outro included.
    pub fn narration_script(&self) -> SessionResult<String> {
        narration_body(self.exercise.script_kind(), &self.items)
            .map(|body| prepare_full_script(&body))
            .ok_or_else(|| {
                SessionError::Generation(format!(
                    "{:?} has no narrated version",
                    self.exercise.activity()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::timeline::{PhaseKind, PhaseScheduler};

    fn generator(seed: u64) -> SequenceGenerator<StdRng> {
        SequenceGenerator::with_rng(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn body_scan_plan_matches_its_sequence() {
        let settings = GuidedSettings::default();
        let plan = SessionPlan::build(
            &Exercise::BodyScan,
            SessionMode::SelfPaced,
            &settings,
            &mut generator(7),
        )
        .unwrap();
        assert!((7..=11).contains(&plan.items.len()));
        assert_eq!(plan.timeline.len(), plan.items.len() + 3);
        assert_eq!(
            plan.timeline.total_secs(),
            BodyScanDurations::SELF_PACED.total(plan.items.len())
        );
    }

    #[test]
    fn narrated_body_scan_uses_narrated_pacing() {
        let settings = GuidedSettings::default();
        let plan = SessionPlan::build(
            &Exercise::BodyScan,
            SessionMode::Narrated,
            &settings,
            &mut generator(3),
        )
        .unwrap();
        assert_eq!(plan.timeline.phase(0).map(|p| p.duration_secs), Some(12.0));
        let script = plan.narration_script().unwrap();
        assert!(script.starts_with("Welcome."));
        assert!(script.contains(&plan.items[0].name));
    }

    #[test]
    fn breathing_follows_settings_and_has_no_narration() {
        let mut settings = GuidedSettings::default();
        settings.box_breathing.cycles = 2;
        let plan = SessionPlan::build(
            &Exercise::BoxBreathing,
            SessionMode::SelfPaced,
            &settings,
            &mut generator(1),
        )
        .unwrap();
        assert_eq!(plan.timeline.total_secs(), 32.0);
        assert_eq!(plan.timeline.phase(1).map(|p| p.kind), Some(PhaseKind::HoldIn));
        assert!(matches!(
            plan.narration_script(),
            Err(SessionError::Generation(_))
        ));
    }

    #[test]
    fn affirmations_draw_ten_distinct_lines() {
        let plan = SessionPlan::build(
            &Exercise::Affirmations {
                theme: AffirmationTheme::Healing,
            },
            SessionMode::SelfPaced,
            &GuidedSettings::default(),
            &mut generator(11),
        )
        .unwrap();
        assert_eq!(plan.items.len(), AFFIRMATIONS_PER_SESSION);
        assert_eq!(plan.timeline.total_secs(), 100.0);
        let mut names: Vec<_> = plan.items.iter().map(|item| &item.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), AFFIRMATIONS_PER_SESSION);
    }

    #[test]
    fn narrated_release_opens_with_the_spoken_welcome() {
        let plan = SessionPlan::build(
            &Exercise::ReleasingMemories,
            SessionMode::Narrated,
            &GuidedSettings::default(),
            &mut generator(5),
        )
        .unwrap();
        let scheduler = PhaseScheduler::new(Arc::clone(&plan.timeline));

        let early = scheduler.phase_at(5.0);
        assert_eq!(early.phase.kind, PhaseKind::Intro);
        let text = plan.resolver.text_at(&early, &plan.items);
        assert!(!plan.items.iter().any(|item| item.name == text), "{text}");

        let first = scheduler.phase_at(presets::SPOKEN_INTRO_SECS + 1.0);
        assert_eq!(plan.resolver.text_at(&first, &plan.items), plan.items[0].name);
        assert_eq!(plan.timeline.last().kind, PhaseKind::Closing);
    }

    #[test]
    fn empty_personal_list_cannot_start() {
        let result = SessionPlan::build(
            &Exercise::PersonalAffirmations {
                affirmations: Vec::new(),
            },
            SessionMode::SelfPaced,
            &GuidedSettings::default(),
            &mut generator(0),
        );
        assert!(matches!(result, Err(SessionError::EmptyTimeline)));
    }
}
