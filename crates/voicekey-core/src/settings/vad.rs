use serde::{Deserialize, Serialize};

fn default_webrtc_sensitivity() -> u8 {
    3
}

fn default_silero_sensitivity() -> f32 {
    0.05
}

fn default_post_speech_silence_duration() -> f32 {
    0.7
}

fn default_min_length_of_recording() -> f32 {
    1.0
}

/// Two-stage VAD settings (C1, C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    /// Coarse-stage aggressiveness, 0-3. Higher is less sensitive to
    /// background noise.
    #[serde(default = "default_webrtc_sensitivity")]
    pub webrtc_sensitivity: u8,

    /// Precise-stage probability threshold, 0.0-1.0. Lower is more
    /// sensitive.
    #[serde(default = "default_silero_sensitivity")]
    pub silero_sensitivity: f32,

    /// Consecutive non-speech time that closes an open utterance.
    #[serde(default = "default_post_speech_silence_duration")]
    pub post_speech_silence_duration: f32,

    /// Utterances shorter than this are discarded without a final
    /// transcript (spec.md §4.3 Closing state).
    #[serde(default = "default_min_length_of_recording")]
    pub min_length_of_recording: f32,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            webrtc_sensitivity: default_webrtc_sensitivity(),
            silero_sensitivity: default_silero_sensitivity(),
            post_speech_silence_duration: default_post_speech_silence_duration(),
            min_length_of_recording: default_min_length_of_recording(),
        }
    }
}
