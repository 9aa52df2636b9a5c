pub mod body_scan;

use serde::{Deserialize, Serialize};

use crate::sequence::FocusItem;
use crate::timeline::{Phase, PhaseKind, PhasePosition};

pub const PAUSED_TEXT: &str = "Meditation paused. Take your time, and resume when ready.";

/// Which family of wording a session reads from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScriptKind {
    BodyScan,
    BoxBreathing,
    /// Each item's text is read verbatim: release blocks and affirmations.
    Lines,
}

/// Self-paced reading and pre-rendered narration are paced differently, so the
/// wording shown has to come from the bank matching the active mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScriptBank {
    SelfPaced,
    Narrated,
}

#[derive(Debug, Clone)]
pub struct ScriptResolver {
    kind: ScriptKind,
    bank: ScriptBank,
    announced_minutes: u64,
}

impl ScriptResolver {
    pub fn new(kind: ScriptKind, bank: ScriptBank, item_count: usize) -> Self {
        Self {
            kind,
            bank,
            announced_minutes: body_scan::announced_minutes(item_count),
        }
    }

    pub fn bank(&self) -> ScriptBank {
        self.bank
    }

    /// One concrete line for `phase` at `offset` seconds into it. The item index
    /// comes from the phase itself; `next` is only consulted for transitions.
    pub fn text_for(
        &self,
        phase: &Phase,
        offset: f64,
        focus: Option<&FocusItem>,
        next: Option<&FocusItem>,
    ) -> String {
        let index = phase.item_index.unwrap_or(0);
        match self.kind {
            ScriptKind::BodyScan => match (phase.kind, focus) {
                (PhaseKind::Body, Some(part)) => match self.bank {
                    ScriptBank::SelfPaced => body_scan::read_part(index, offset, part, next),
                    ScriptBank::Narrated => body_scan::listen_part(index, offset, part),
                },
                (PhaseKind::Body, None) => String::new(),
                (kind, _) => match self.bank {
                    ScriptBank::SelfPaced => {
                        body_scan::read_boundary(kind, offset, self.announced_minutes)
                    }
                    ScriptBank::Narrated => body_scan::listen_boundary(kind, offset).to_string(),
                },
            },
            ScriptKind::BoxBreathing => breathing_cue(phase.kind).to_string(),
            ScriptKind::Lines => match (phase.kind, focus) {
                // The spoken welcome and farewell around narrated lines.
                (PhaseKind::Intro | PhaseKind::Closing, _) => {
                    body_scan::listen_boundary(phase.kind, offset).to_string()
                }
                (_, Some(item)) => item.name.clone(),
                (_, None) => String::new(),
            },
        }
    }

    /// Resolves text for a scheduler position against the session's sequence.
    pub fn text_at(&self, position: &PhasePosition, items: &[FocusItem]) -> String {
        let focus = position.phase.item_index.and_then(|index| items.get(index));
        let next = position
            .phase
            .item_index
            .and_then(|index| items.get(index + 1));
        self.text_for(&position.phase, position.offset_secs, focus, next)
    }
}

pub fn breathing_cue(kind: PhaseKind) -> &'static str {
    match kind {
        PhaseKind::Inhale => "Breathe In...",
        PhaseKind::HoldIn | PhaseKind::HoldOut => "Hold...",
        PhaseKind::Exhale => "Breathe Out...",
        _ => "Ready?",
    }
}

/// Body text sent for narration, before the fixed intro and outro are added.
/// `None` for exercises that are never narrated.
pub fn narration_body(kind: ScriptKind, items: &[FocusItem]) -> Option<String> {
    match kind {
        ScriptKind::BodyScan => {
            let mut parts: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(index, part)| body_scan::narration_part(index, part))
                .collect();
            parts.push(body_scan::NARRATION_WHOLE_BODY.to_string());
            Some(parts.join("\n"))
        }
        ScriptKind::Lines => Some(
            items
                .iter()
                .map(|item| format!("{}\n[PAUSE_3]", item.name))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        ScriptKind::BoxBreathing => None,
    }
}
