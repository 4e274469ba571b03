//! Application settings.
//!
//! # Architecture
//!
//! ```text
//! Settings (Aggregate Root)
//!   ├── audio            - capture device, sample rate, pre-roll
//!   ├── vad               - two-stage VAD thresholds and timing
//!   ├── transcription      - preview/final model parameters
//!   ├── keystroke            - typing delays
//!   ├── hotkey                 - chord, tap timing, arm/disarm delay
//!   ├── agent                    - agent-mode buffer and command template
//!   ├── word_mappings               - spoken-phrase substitutions
//!   └── discard_phrases                - hallucinated-filler filter
//! ```
//!
//! # File Location
//!
//! Settings are stored at `~/.config/voicekey/settings.json` with 0600
//! permissions on Unix.

mod agent;
mod audio;
mod discard;
mod hotkey;
mod keystroke;
mod transcription;
mod vad;
mod word_mappings;

pub use agent::AgentSettings;
pub use audio::AudioSettings;
pub use discard::DiscardPhrasesSettings;
pub use hotkey::HotkeySettings;
pub use keystroke::KeystrokeSettings;
pub use transcription::TranscriptionSettings;
pub use vad::VadSettings;
pub use word_mappings::{Action, WordMappingsSettings};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Application settings (aggregate root).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub vad: VadSettings,
    #[serde(default)]
    pub transcription: TranscriptionSettings,
    #[serde(default)]
    pub keystroke: KeystrokeSettings,
    #[serde(default)]
    pub hotkey: HotkeySettings,
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub word_mappings: WordMappingsSettings,
    #[serde(default)]
    pub discard_phrases: DiscardPhrasesSettings,
}

impl Settings {
    /// Get the settings file path (~/.config/voicekey/settings.json).
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voicekey")
            .join("settings.json")
    }

    /// Load settings from disk, bootstrapping a default file on first run.
    ///
    /// Returns default settings if the file doesn't exist or can't be
    /// parsed; a missing file is written once so `voicekey config --path`
    /// shows something editable immediately.
    pub fn load() -> Self {
        Self::load_from(Self::path())
    }

    /// Load settings from a caller-chosen path (spec.md §6 CLI surface:
    /// "alternate config path"), bootstrapping a default file there on
    /// first run. Behaves exactly like `load()` otherwise.
    pub fn load_from(path: PathBuf) -> Self {
        if let Ok(content) = fs::read_to_string(&path)
            && let Ok(settings) = serde_json::from_str(&content)
        {
            return settings;
        }

        let settings = Self::default();
        if !path.exists()
            && let Err(err) = settings.save_to(&path)
        {
            crate::warn!("could not bootstrap default settings file: {err}");
        }
        settings
    }

    /// Save settings to disk with 0600 permissions on Unix.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    fn save_to(&self, path: &std::path::Path) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&path)?;
            file.write_all(content.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, &content)?;
        }

        Ok(())
    }

    /// Validate all settings, normalizing word mappings and discard
    /// phrases to lowercase so `should_discard`/`apply_word_map` see
    /// already-normalized keys.
    pub fn validate(&mut self) -> Result<()> {
        self.hotkey.validate()?;
        if self.agent.agent_command_template.is_empty() {
            crate::warn!("agent.agent_command_template is empty; AGENT mode cannot dispatch until configured");
        }
        self.word_mappings.normalize();
        self.discard_phrases.normalize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_round_trip_json() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.hotkey.chord, settings.hotkey.chord);
    }
}
