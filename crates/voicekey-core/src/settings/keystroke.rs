use serde::{Deserialize, Serialize};

fn default_typing_delay_ms() -> u64 {
    10
}

fn default_key_hold_ms() -> u64 {
    20
}

/// Keystroke output settings (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystrokeSettings {
    /// Delay between characters while typing, in milliseconds.
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: u64,

    /// Delay between a key's press and its release, in milliseconds.
    #[serde(default = "default_key_hold_ms")]
    pub key_hold_ms: u64,
}

impl Default for KeystrokeSettings {
    fn default() -> Self {
        Self {
            typing_delay_ms: default_typing_delay_ms(),
            key_hold_ms: default_key_hold_ms(),
        }
    }
}
