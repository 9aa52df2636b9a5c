use serde::{Deserialize, Serialize};

use super::{FocusCategory, FocusItem};

const UPPER: [&str; 7] = [
    "left hand",
    "right hand",
    "left arm",
    "right arm",
    "shoulders",
    "chest",
    "upper back",
];

const LOWER: [&str; 9] = [
    "left leg",
    "right leg",
    "left knee",
    "right knee",
    "left foot",
    "right foot",
    "hips",
    "left ankle",
    "right ankle",
];

const CENTRAL: [&str; 4] = ["spine", "abdomen", "pelvis", "lower back"];

const HEAD: [&str; 6] = [
    "jaw",
    "scalp",
    "back of the head",
    "throat",
    "forehead",
    "temples",
];

/// The concatenated body-region pool used by the body scan.
pub fn body_parts() -> Vec<FocusItem> {
    let groups: [(&[&str], FocusCategory); 4] = [
        (&UPPER, FocusCategory::Upper),
        (&LOWER, FocusCategory::Lower),
        (&CENTRAL, FocusCategory::Central),
        (&HEAD, FocusCategory::Head),
    ];
    groups
        .iter()
        .flat_map(|(names, category)| {
            names
                .iter()
                .map(move |name| FocusItem::new(*name, *category))
        })
        .collect()
}

/// Fixed script of the memory-release journey: `(text, seconds)`.
pub const RELEASE_BLOCKS: [(&str, u32); 12] = [
    ("Take a slow breath in...\nAnd gently close your eyes.", 8),
    (
        "Imagine yourself sitting quietly in a peaceful forest at twilight.\nThe air is soft. The world is still.",
        10,
    ),
    (
        "With calm awareness, bring to mind a memory that feels heavy ---\na thought you no longer need to carry.",
        10,
    ),
    ("Without judgment... simply notice it.", 6),
    (
        "Now imagine reaching up gently...\nand lifting that memory from your mind.",
        8,
    ),
    ("See it as a dark, smoky fragment resting in your hands.", 7),
    ("In front of you, a warm fire glows softly.", 6),
    ("When you're ready...\nplace the memory into the flames.", 8),
    (
        "Watch as it transforms ---\ndarkness dissolving into golden light...\nrising upward... gone.",
        12,
    ),
    (
        "Feel your chest grow lighter.\nYour breath deepens.\nYour shoulders soften.",
        10,
    ),
    ("You are not your past.\nYou are free to release.", 8),
    ("Take one final slow breath...\nand open your eyes.", 8),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AffirmationTheme {
    Calm,
    Confidence,
    Healing,
    Clarity,
    Strength,
}

impl AffirmationTheme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "calm" => Some(Self::Calm),
            "confidence" => Some(Self::Confidence),
            "healing" => Some(Self::Healing),
            "clarity" => Some(Self::Clarity),
            "strength" => Some(Self::Strength),
            _ => None,
        }
    }

    pub fn lines(self) -> &'static [&'static str] {
        match self {
            Self::Calm => &CALM,
            Self::Confidence => &CONFIDENCE,
            Self::Healing => &HEALING,
            Self::Clarity => &CLARITY,
            Self::Strength => &STRENGTH,
        }
    }

    pub fn pool(self) -> Vec<FocusItem> {
        self.lines().iter().map(|line| FocusItem::line(*line)).collect()
    }
}

/// A user-authored affirmation, optionally anchored to a habit cue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalAffirmation {
    pub text: String,
    pub trigger: Option<String>,
    pub repeats: u32,
}

impl PersonalAffirmation {
    pub fn spoken(&self) -> String {
        match self.trigger.as_deref().map(str::trim) {
            Some(trigger) if !trigger.is_empty() => {
                format!("When I {}, I will {}", trigger, self.text)
            }
            _ => self.text.clone(),
        }
    }
}

/// Expands each affirmation into `repeats` consecutive lines.
pub fn personal_lines(affirmations: &[PersonalAffirmation]) -> Vec<FocusItem> {
    affirmations
        .iter()
        .flat_map(|affirmation| {
            let line = affirmation.spoken();
            (0..affirmation.repeats).map(move |_| FocusItem::line(line.clone()))
        })
        .collect()
}

const CALM: [&str; 14] = [
    "I am grounded in this moment and at peace with what is.",
    "I choose to respond with calm, not react with fear.",
    "I breathe deeply and release all tension from my body.",
    "Peace flows through me with every breath I take.",
    "I am centered, balanced, and completely at ease.",
    "Calmness is my natural state of being.",
    "I let go of what I cannot control and embrace serenity.",
    "My mind is quiet, my heart is peaceful.",
    "I am safe, I am calm, I am present.",
    "Tranquility surrounds me and fills me completely.",
    "I release anxiety and welcome peace into my life.",
    "Every breath brings me deeper into relaxation.",
    "I am still, I am calm, I am whole.",
    "Peace is my power, calm is my strength.",
];

const CONFIDENCE: [&str; 14] = [
    "I trust myself to make decisions that honor my well-being.",
    "I am worthy of confidence, compassion, and care.",
    "I believe in my abilities and trust my journey.",
    "I am capable of achieving anything I set my mind to.",
    "My confidence grows stronger every day.",
    "I trust my intuition and inner wisdom.",
    "I am enough exactly as I am right now.",
    "I speak my truth with courage and clarity.",
    "I deserve success and embrace my power.",
    "I am bold, brave, and becoming more confident.",
    "My voice matters and my presence is valuable.",
    "I step into my power with grace and certainty.",
    "I trust myself completely and act with confidence.",
    "I am worthy of all the good things coming my way.",
];

const HEALING: [&str; 14] = [
    "I am healing, even in ways I cannot yet see.",
    "I allow my body and mind the time they need to restore.",
    "Every day, I am becoming healthier and stronger.",
    "I release what no longer serves me and welcome healing.",
    "My body knows how to heal, and I trust the process.",
    "I am gentle with myself as I heal and grow.",
    "Healing energy flows through every cell of my being.",
    "I forgive myself and others, freeing myself to heal.",
    "I am worthy of complete healing and restoration.",
    "Each breath brings healing light into my body.",
    "I honor my healing journey with patience and love.",
    "I am transforming pain into wisdom and strength.",
    "My past does not define me; I am healing and whole.",
    "I embrace the healing power within me.",
];

const CLARITY: [&str; 14] = [
    "I see clearly what matters most and let go of the rest.",
    "I move through challenges with clarity and grace.",
    "My mind is clear, focused, and sharp.",
    "I trust my ability to see the truth in any situation.",
    "Clarity comes easily to me when I need it most.",
    "I release confusion and welcome clear understanding.",
    "I see my path forward with perfect clarity.",
    "My thoughts are organized and purposeful.",
    "I make decisions with clarity and confidence.",
    "I cut through complexity and see what is real.",
    "Mental clarity is my natural state of being.",
    "I focus on what truly matters and release the rest.",
    "I see situations clearly and respond wisely.",
    "Clarity illuminates my mind and guides my actions.",
];

const STRENGTH: [&str; 14] = [
    "I carry strength within me, even when I feel uncertain.",
    "I am resilient, capable, and enough exactly as I am.",
    "I am stronger than any challenge I face.",
    "My strength comes from within and cannot be shaken.",
    "I rise above difficulties with courage and determination.",
    "I am powerful beyond measure.",
    "Every challenge makes me stronger and wiser.",
    "I have overcome so much, and I will overcome this too.",
    "My inner strength is limitless and unbreakable.",
    "I am a warrior, and I face life with courage.",
    "I draw on my inner reserves of strength and resilience.",
    "I am strong enough to handle whatever comes my way.",
    "My strength inspires others and empowers myself.",
    "I am rooted in strength and grounded in power.",
];
