//! Body-scan wording. Each per-part phase is cut into fixed windows and every
//! window rotates through a few variants keyed by the part's index, so
//! neighbouring parts never read the same sentence.

use crate::sequence::FocusItem;
use crate::timeline::PhaseKind;

pub const DESCRIPTION: &str = "A guided practice to bring awareness through your body, noticing subtle sensations and aliveness in each area.";

struct PartVariant {
    introduce: &'static str,
    explore: &'static str,
    rest: &'static str,
}

const READ_VARIANTS: [PartVariant; 3] = [
    PartVariant {
        introduce: "Bring your awareness now to your {part}.",
        explore: "What do you notice here? Perhaps warmth, tingling, or a sense of aliveness in your {part}.",
        rest: "Simply be with whatever you find. No need to change or fix anything in your {part}.",
    },
    PartVariant {
        introduce: "Let your attention settle into your {part}.",
        explore: "Notice the sensations... maybe pulsing, pressure, or a gentle vibration in your {part}.",
        rest: "Just observing. Allowing your {part} to be exactly as it is.",
    },
    PartVariant {
        introduce: "Gently shift your focus to your {part}.",
        explore: "Sense into this area. You might feel temperature, texture, or subtle movement in your {part}.",
        rest: "Rest your awareness here. Whatever is present in your {part} is perfectly okay.",
    },
];

const READ_TRANSITIONS: [&str; 3] = [
    "And now, let your awareness travel from your {part} to your {next}.",
    "Gently guide your attention from your {part}... moving to your {next}.",
    "Allow your focus to shift naturally from your {part} toward your {next}.",
];

const READ_LAST_PART: &str = "Take one more breath with your {part}... noticing what's here.";

struct ListenVariant {
    arrive: &'static str,
    observe: &'static str,
    allow: &'static str,
    settle: &'static str,
}

const LISTEN_VARIANTS: [ListenVariant; 2] = [
    ListenVariant {
        arrive: "Allow your awareness to drift gently toward your {part}.",
        observe: "Observe the subtle landscape of sensation here... perhaps a softness, or a quiet pulse.",
        allow: "Simply noticing, without needing to change a thing.",
        settle: "Being present.",
    },
    ListenVariant {
        arrive: "Gently guide your focus into your {part}.",
        observe: "Notice the temperature... the texture... the very aliveness within your {part}.",
        allow: "Letting go of any effort.",
        settle: "Resting in this breath.",
    },
];

fn fill(template: &str, part: &FocusItem, next: Option<&FocusItem>) -> String {
    let text = template.replace("{part}", &part.name);
    match next {
        Some(next) => text.replace("{next}", &next.name),
        None => text,
    }
}

/// Self-paced reading: 0-8s introduce, 8-18s explore, 18-28s rest, then a
/// transition to the next part, or closing phrasing on the last one.
pub fn read_part(index: usize, offset: f64, part: &FocusItem, next: Option<&FocusItem>) -> String {
    let variant = &READ_VARIANTS[index % READ_VARIANTS.len()];
    if offset < 8.0 {
        fill(variant.introduce, part, None)
    } else if offset < 18.0 {
        fill(variant.explore, part, None)
    } else if offset < 28.0 {
        fill(variant.rest, part, None)
    } else if next.is_some() {
        fill(READ_TRANSITIONS[index % READ_TRANSITIONS.len()], part, next)
    } else {
        fill(READ_LAST_PART, part, None)
    }
}

/// Mirrors the pre-rendered narration, which is paced at 5/12/18s.
pub fn listen_part(index: usize, offset: f64, part: &FocusItem) -> String {
    let variant = &LISTEN_VARIANTS[index % LISTEN_VARIANTS.len()];
    let template = if offset < 5.0 {
        variant.arrive
    } else if offset < 12.0 {
        variant.observe
    } else if offset < 18.0 {
        variant.allow
    } else {
        variant.settle
    };
    fill(template, part, None)
}

/// Approximate length announced in the self-paced intro.
pub fn announced_minutes(parts: usize) -> u64 {
    let seconds = 15 + parts as u64 * 35 + 20 + 20;
    seconds.div_ceil(60)
}

pub fn read_boundary(kind: PhaseKind, offset: f64, minutes: u64) -> String {
    match kind {
        PhaseKind::Intro => {
            if offset < 4.0 {
                format!("This meditation will last approximately {minutes} minutes. A gentle gong will sound at the end to bring you back to centre.")
            } else if offset < 8.0 {
                "If you feel complete before the meditation ends, simply rest quietly until you hear the gong.".to_string()
            } else if offset < 12.0 {
                "Find a comfortable position\u{2014}sitting or lying down, whatever feels right for you. Let your gaze soften.".to_string()
            } else if offset < 15.0 {
                "Notice your breath... the natural rhythm of breathing. No need to change anything.".to_string()
            } else {
                "As you settle, if it feels comfortable, you might allow your eyes to gently close.".to_string()
            }
        }
        PhaseKind::WholeBody => {
            if offset < 10.0 {
                "Now, expand your awareness... let it include your whole body. Feel yourself as a complete presence.".to_string()
            } else {
                "Notice the aliveness throughout\u{2014}a field of sensation, vibration, energy flowing through you.".to_string()
            }
        }
        PhaseKind::Closing => {
            if offset < 8.0 {
                "Begin to deepen your breath, just a little. Feel the air moving in... and out.".to_string()
            } else if offset < 15.0 {
                "When you're ready, bring some gentle movement to your fingers and toes. Take your time.".to_string()
            } else {
                "In your own time, you might blink your eyes open and return to the space around you.".to_string()
            }
        }
        _ => String::new(),
    }
}

pub fn listen_boundary(kind: PhaseKind, offset: f64) -> &'static str {
    match kind {
        PhaseKind::Intro => {
            if offset < 3.0 {
                "Welcome."
            } else if offset < 6.0 {
                "Take a moment to simply be."
            } else if offset < 9.0 {
                "Release any expectations, and just notice."
            } else {
                "Let\u{2019}s begin."
            }
        }
        PhaseKind::WholeBody => {
            if offset < 5.0 {
                "Now, feel your presence... your entire body as one field of awareness."
            } else if offset < 10.0 {
                "Complete. Still."
            } else {
                "Perfectly at peace."
            }
        }
        PhaseKind::Closing => {
            if offset < 5.0 {
                "Gently returning to the space around you."
            } else {
                "Peace."
            }
        }
        _ => "",
    }
}

/// Narration body for one part, `[PAUSE_n]` marking silences.
pub fn narration_part(index: usize, part: &FocusItem) -> String {
    let variant = &LISTEN_VARIANTS[index % LISTEN_VARIANTS.len()];
    format!(
        "{}\n[PAUSE_5]\n{}\n[PAUSE_8]\n{}\n[PAUSE_5]\n{}\n[PAUSE_8]",
        fill(variant.arrive, part, None),
        fill(variant.observe, part, None),
        fill(variant.allow, part, None),
        fill(variant.settle, part, None),
    )
}

pub const NARRATION_WHOLE_BODY: &str = "Now, feel your presence... your entire body as one field of awareness.\n[PAUSE_8]\nComplete. Still.\n[PAUSE_8]\nPerfectly at peace.\n[PAUSE_8]";
