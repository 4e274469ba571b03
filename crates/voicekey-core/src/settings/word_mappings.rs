use serde::{Deserialize, Serialize};

/// What a spoken phrase resolves to once matched (§3 WordMap, §4.5 step 4).
///
/// A replacement is classified at lookup time, not at config-load time: a
/// replacement string containing `+` and shorter than 20 characters is
/// treated as a chord; anything else is typed verbatim. That heuristic lives
/// in `crate::keystroke::substitution::classify`, not here — this type is
/// just the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Typed verbatim, substitutions already resolved.
    Literal(String),
    /// Pressed and released as a chord, e.g. "ctrl+z".
    Hotkey(String),
}

/// Spoken-phrase substitution table (§3 WordMap, §4.5).
///
/// Stored as an ordered list of `(phrase, replacement)` pairs rather than a
/// `HashMap`: spec.md §3 requires rewrite order to be "longest phrase first,
/// ties broken by insertion order", and a `HashMap` has no stable iteration
/// order to break ties with. Serialized as a JSON array of two-element
/// arrays, e.g. `[["comma", ","], ["now undo", "ctrl+z"]]`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WordMappingsSettings {
    pub mappings: Vec<(String, String)>,
}

impl WordMappingsSettings {
    /// Lowercase phrase keys in place so lookups in
    /// `keystroke::substitution::apply_word_map` don't need to
    /// re-normalize on every call. Insertion order (and therefore the
    /// tie-break rule) is preserved.
    pub fn normalize(&mut self) {
        for (phrase, _) in self.mappings.iter_mut() {
            *phrase = phrase.to_lowercase();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_keys_and_preserves_order() {
        let mut settings = WordMappingsSettings {
            mappings: vec![
                ("Now Undo".to_string(), "ctrl+z".to_string()),
                ("comma".to_string(), ",".to_string()),
            ],
        };
        settings.normalize();
        assert_eq!(settings.mappings[0].0, "now undo");
        assert_eq!(settings.mappings[1].0, "comma");
    }
}
