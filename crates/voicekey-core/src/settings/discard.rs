use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_phrases() -> HashSet<String> {
    ["thank you", "thanks", "you"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Discard-filter phrase set (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscardPhrasesSettings {
    #[serde(default = "default_phrases")]
    pub phrases: HashSet<String>,
}

impl Default for DiscardPhrasesSettings {
    fn default() -> Self {
        Self {
            phrases: default_phrases(),
        }
    }
}

impl DiscardPhrasesSettings {
    pub fn normalize(&mut self) {
        self.phrases = self.phrases.drain().map(|p| p.to_lowercase()).collect();
    }
}
