pub mod generator;
pub mod pools;

pub use generator::{category_cap, SequenceGenerator};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FocusCategory {
    Upper,
    Lower,
    Central,
    Head,
    /// A line spoken verbatim: affirmations and fixed release-script blocks.
    Line,
}

/// One discrete subject visited during a multi-item session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FocusItem {
    pub name: String,
    pub category: FocusCategory,
}

impl FocusItem {
    pub fn new(name: impl Into<String>, category: FocusCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        Self::new(text, FocusCategory::Line)
    }
}
