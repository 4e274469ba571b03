//! Discard Filter (C6).
//!
//! Drops known-spurious phrases — empirically, Whisper-family models
//! hallucinate "thank you"/"thanks"/"you" on pure silence (spec.md §4.6,
//! grounded in `original_source/whisper/keyboard_output.py`'s
//! `DEFAULT_DISCARD_PHRASES` and `should_discard`).

use std::collections::HashSet;

/// Lowercase the input and strip outer whitespace and outer punctuation
/// `[ .,!?;:]` (spec.md §4.6). Applied on both sides of Testable Property 6
/// (`should_discard(x) == should_discard(normalize(x))`), so normalization
/// must be idempotent: normalizing an already-normalized string is a no-op.
pub fn normalize(text: &str) -> String {
    const OUTER_PUNCT: &[char] = &[' ', '.', ',', '!', '?', ';', ':'];
    text.to_lowercase()
        .trim_matches(OUTER_PUNCT)
        .to_string()
}

/// `should_discard(text) -> bool` (spec.md §4.6). An empty/whitespace-only
/// string never matches unless the configured set itself contains the empty
/// string.
pub fn should_discard(text: &str, discard_phrases: &HashSet<String>) -> bool {
    discard_phrases.contains(&normalize(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases() -> HashSet<String> {
        ["thank you", "thanks", "you"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn discards_default_phrases_case_insensitively() {
        let set = phrases();
        assert!(should_discard("Thank you.", &set));
        assert!(should_discard("  THANKS!  ", &set));
        assert!(should_discard("you", &set));
    }

    #[test]
    fn keeps_real_speech() {
        let set = phrases();
        assert!(!should_discard("hello world", &set));
        assert!(!should_discard("thank you very much", &set));
    }

    // Testable Property 6: should_discard is idempotent under normalize.
    #[test]
    fn normalize_is_idempotent_for_should_discard() {
        let set = phrases();
        let inputs = ["Thank You!", "  you  ", "thanks,", "hello"];
        for input in inputs {
            assert_eq!(
                should_discard(input, &set),
                should_discard(&normalize(input), &set)
            );
        }
    }

    #[test]
    fn normalize_strips_outer_punct_and_whitespace_only() {
        assert_eq!(normalize("  Thank You.  "), "thank you");
        assert_eq!(normalize("you,"), "you");
        assert_eq!(normalize("...you..."), "you");
    }
}
