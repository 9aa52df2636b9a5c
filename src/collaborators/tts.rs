use async_trait::async_trait;

use super::NarrationAsset;
use crate::error::SessionResult;

/// Longest silence a single pause marker may ask for, in ellipsis lines.
const MAX_PAUSE_LINES: usize = 8;

const INTRO: &str = "Welcome.
...
...
...
...
...
Take a moment to simply be.
...
...
...
...
...
Release any expectations... and just notice.
...
...
...
...
...
...
...
...
Let us begin.
...
...
...
...
...";

const OUTRO: &str = "...
...
...
...
...
...
...
...
Gently returning to the space around you.
...
...
...
...
...
Peace.";

#[async_trait]
pub trait TtsClient: Send + Sync {
    /// Renders `full_text` (already wrapped by [`prepare_full_script`]).
    async fn text_to_speech(&self, full_text: &str) -> SessionResult<NarrationAsset>;
}

/// Wraps body text in the fixed spoken intro and outro.
pub fn prepare_full_script(body: &str) -> String {
    format!("{}\n{}\n{}", INTRO, body, OUTRO)
}

/// Replaces `[PAUSE_n]` markers with `min(n, 8)` lines of ellipses. Plain text
/// pauses are more stable across voices than markup.
pub fn preprocess_text(text: &str) -> String {
    const OPEN: &str = "[PAUSE_";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        match (digits > 0, after[digits..].starts_with(']')) {
            (true, true) => {
                let count = after[..digits]
                    .parse::<usize>()
                    .unwrap_or(MAX_PAUSE_LINES)
                    .min(MAX_PAUSE_LINES);
                out.push('\n');
                out.push_str(&"...\n".repeat(count));
                rest = &after[digits + 1..];
            }
            _ => {
                // Not a marker; keep the text as written.
                out.push_str(OPEN);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_markers_become_ellipsis_lines() {
        assert_eq!(preprocess_text("Breathe.[PAUSE_2]Rest."), "Breathe.\n...\n...\nRest.");
    }

    #[test]
    fn long_pauses_are_capped() {
        let processed = preprocess_text("[PAUSE_30]");
        assert_eq!(processed.matches("...").count(), 8);
    }

    #[test]
    fn malformed_markers_are_left_alone() {
        assert_eq!(preprocess_text("[PAUSE_x] and [PAUSE_3"), "[PAUSE_x] and [PAUSE_3");
    }

    #[test]
    fn full_script_has_intro_and_outro() {
        let script = prepare_full_script("Notice your hands.");
        assert!(script.starts_with("Welcome."));
        assert!(script.contains("Let us begin.\n...\n...\n...\n...\n...\nNotice your hands.\n"));
        assert!(script.ends_with("Peace."));
    }
}
