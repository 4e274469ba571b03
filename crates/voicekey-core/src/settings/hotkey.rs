use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

fn default_chord() -> String {
    "ctrl+alt+w".to_string()
}

fn default_double_tap_window() -> f32 {
    0.5
}

fn default_listening_state_delay_ms() -> u64 {
    300
}

fn default_sounds_enabled() -> bool {
    true
}

fn default_sound_on_listening_start() -> String {
    "sfx/on.wav".to_string()
}

fn default_sound_on_listening_stop() -> String {
    "sfx/off.wav".to_string()
}

/// Mode/hotkey controller settings (C7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeySettings {
    /// Global chord string, e.g. "ctrl+alt+w". Parsed by
    /// `crate::mode::hotkey_chord::Hotkey::parse`.
    #[serde(default = "default_chord")]
    pub chord: String,

    /// Max gap between two presses that counts as a double-tap.
    #[serde(default = "default_double_tap_window")]
    pub double_tap_window: f32,

    /// Delay after arming before the Preload/Resume Gate flips to
    /// RESUMED, so the arm-feedback beep doesn't seed a spurious
    /// utterance.
    #[serde(default = "default_listening_state_delay_ms")]
    pub listening_state_delay_ms: u64,

    /// Gates whether the Mode/Hotkey Controller's Sound interface calls
    /// do anything; lets the external `Sound` collaborator be wired to a
    /// no-op without touching arm/disarm logic.
    #[serde(default = "default_sounds_enabled")]
    pub sounds_enabled: bool,

    /// Sound asset played on arm (grounded in
    /// `original_source/lib/config.py`'s `sound_on_listening_start`).
    #[serde(default = "default_sound_on_listening_start")]
    pub sound_on_listening_start: String,

    /// Sound asset played on disarm.
    #[serde(default = "default_sound_on_listening_stop")]
    pub sound_on_listening_stop: String,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            chord: default_chord(),
            double_tap_window: default_double_tap_window(),
            listening_state_delay_ms: default_listening_state_delay_ms(),
            sounds_enabled: default_sounds_enabled(),
            sound_on_listening_start: default_sound_on_listening_start(),
            sound_on_listening_stop: default_sound_on_listening_stop(),
        }
    }
}

impl HotkeySettings {
    pub fn validate(&self) -> Result<()> {
        if crate::mode::hotkey_chord::Hotkey::parse(&self.chord).is_none() {
            bail!("invalid hotkey chord: {}", self.chord);
        }
        if self.double_tap_window <= 0.0 {
            bail!("double_tap_window must be positive");
        }
        Ok(())
    }
}
