//! Word substitution algorithm (spec.md §4.5), applied only to final text.
//!
//! Grounded in `original_source/whisper/keyboard_output.py`'s
//! `_apply_word_mappings`: sort by phrase length descending, replace with
//! numbered markers, then split on the markers and classify each
//! replacement as a chord or a literal. No `regex` crate exists anywhere in
//! the example pack, so matching is done by hand over `Vec<char>`.

use crate::settings::Action;

const MARKER_OPEN: char = '\u{e000}';
const MARKER_CLOSE: char = '\u{e001}';

/// Strip one trailing period (and any whitespace after it), mirroring
/// Whisper's habit of hallucinating a sentence-ending period. Only removes
/// the period if it is the last non-whitespace character; leaves text with
/// no trailing period untouched, whitespace included.
fn trim_trailing_period(text: &str) -> String {
    let trimmed = text.trim_end();
    match trimmed.strip_suffix('.') {
        Some(rest) => rest.to_string(),
        None => text.to_string(),
    }
}

/// A replacement is a chord if it contains `+` and is short; otherwise it
/// is typed verbatim (spec.md §4.5 step 4).
fn classify(replacement: &str) -> Action {
    if replacement.contains('+') && replacement.chars().count() < 20 {
        Action::Hotkey(replacement.to_string())
    } else {
        Action::Literal(replacement.to_string())
    }
}

/// True for replacements made entirely of non-alphanumeric characters
/// (commas, periods, dashes) — these attach to the preceding word rather
/// than float after a spoken-out space, so matching trims the space that
/// precedes them.
fn is_punctuation(replacement: &str) -> bool {
    !replacement.is_empty() && replacement.chars().all(|c| !c.is_alphanumeric())
}

fn is_word_boundary(chars: &[char], idx: usize) -> bool {
    match chars.get(idx) {
        None => true,
        Some(c) => !c.is_alphanumeric(),
    }
}

/// Replace every whole-word, case-insensitive occurrence of `phrase` in
/// `text` with a numbered marker, recording what each marker expands to.
fn replace_phrase(text: &str, phrase: &str, replacement: &str, markers: &mut Vec<Action>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let phrase_chars: Vec<char> = phrase.chars().collect();
    let m = phrase_chars.len();
    if m == 0 {
        return text.to_string();
    }

    let mut result = String::new();
    let mut i = 0;
    while i < chars.len() {
        let matches = i + m <= chars.len()
            && chars[i..i + m]
                .iter()
                .zip(phrase_chars.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
            && (i == 0 || is_word_boundary(&chars, i - 1))
            && is_word_boundary(&chars, i + m);

        if matches {
            if is_punctuation(replacement) && result.ends_with(' ') {
                result.pop();
            }
            markers.push(classify(replacement));
            result.push(MARKER_OPEN);
            result.push_str(&(markers.len() - 1).to_string());
            result.push(MARKER_CLOSE);
            i += m;
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }
    result
}

/// Split marker-annotated text back into an ordered sequence of literal
/// chunks and chord/literal replacement actions.
fn split_markers(text: &str, markers: &[Action]) -> Vec<Action> {
    let mut items = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == MARKER_OPEN {
            let mut digits = String::new();
            for d in chars.by_ref() {
                if d == MARKER_CLOSE {
                    break;
                }
                digits.push(d);
            }
            if !literal.is_empty() {
                items.push(Action::Literal(std::mem::take(&mut literal)));
            }
            if let Ok(idx) = digits.parse::<usize>()
                && let Some(action) = markers.get(idx)
            {
                items.push(action.clone());
            }
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        items.push(Action::Literal(literal));
    }
    items
}

/// Apply word-map substitutions to final transcript text (spec.md §4.5).
/// `mappings` is assumed already lowercased (see
/// `WordMappingsSettings::normalize`); matching itself is case-insensitive
/// regardless.
pub fn apply_word_map(text: &str, mappings: &[(String, String)]) -> Vec<Action> {
    let mut working = trim_trailing_period(text);

    let mut ordered: Vec<&(String, String)> = mappings.iter().collect();
    ordered.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.chars().count()));

    let mut markers = Vec::new();
    for (phrase, replacement) in ordered {
        working = replace_phrase(&working, phrase, replacement, &mut markers);
    }

    if markers.is_empty() {
        return vec![Action::Literal(working)];
    }
    split_markers(&working, &markers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn trims_single_trailing_period() {
        assert_eq!(trim_trailing_period("hello world."), "hello world");
        assert_eq!(trim_trailing_period("hello world.  "), "hello world");
        assert_eq!(trim_trailing_period("hello world"), "hello world");
    }

    // S3: punctuation replacement attaches to the preceding word, keeps
    // the following space, and no mapping means a plain pass-through.
    #[test]
    fn comma_mapping_attaches_to_previous_word() {
        let map = mappings(&[("comma", ",")]);
        let items = apply_word_map("hello comma world", &map);
        assert_eq!(
            items,
            vec![Action::Literal("hello".to_string()), Action::Literal(",".to_string()), Action::Literal(" world".to_string())]
        );
    }

    // S4: a chord replacement keeps the leading space attached to the
    // literal chunk before it.
    #[test]
    fn chord_mapping_is_classified_as_hotkey() {
        let map = mappings(&[("now undo", "ctrl+z")]);
        let items = apply_word_map("fix this now undo", &map);
        assert_eq!(
            items,
            vec![
                Action::Literal("fix this ".to_string()),
                Action::Hotkey("ctrl+z".to_string()),
            ]
        );
    }

    // Testable Property 5: longest-phrase-first tie-breaking. "end of
    // sentence" must win over "end" even though "end" is also present as a
    // substring/prefix match candidate.
    #[test]
    fn longest_phrase_wins_over_shorter_prefix() {
        let map = mappings(&[("end", "STOP"), ("end of sentence", ".")]);
        let items = apply_word_map("this is the end of sentence", &map);
        assert_eq!(
            items,
            vec![Action::Literal("this is the".to_string()), Action::Literal(".".to_string())]
        );
    }

    #[test]
    fn no_mappings_returns_single_literal_chunk() {
        let items = apply_word_map("hello world", &[]);
        assert_eq!(items, vec![Action::Literal("hello world".to_string())]);
    }

    #[test]
    fn unmatched_word_boundaries_do_not_partially_match() {
        // "end" must not match inside "ending".
        let map = mappings(&[("end", "STOP")]);
        let items = apply_word_map("the ending credits", &map);
        assert_eq!(items, vec![Action::Literal("the ending credits".to_string())]);
    }
}
