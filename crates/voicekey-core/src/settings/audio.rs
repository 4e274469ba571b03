use serde::{Deserialize, Serialize};

fn default_sample_rate() -> u32 {
    16_000
}

fn default_frame_size() -> usize {
    512
}

fn default_pre_recording_buffer_duration() -> f32 {
    1.0
}

/// Audio capture settings (C2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Capture sample rate in Hz. The pipeline is built around 16kHz;
    /// changing this also changes the coarse VAD's frame-size math.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frame length in samples (F in spec.md §3).
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    /// Selected microphone device name, matched by substring against
    /// `cpal::Device::name()`. `None` uses the host default device.
    #[serde(default)]
    pub device: Option<String>,

    /// How much audio to retain in the pre-roll ring before an utterance
    /// opens, in seconds.
    #[serde(default = "default_pre_recording_buffer_duration")]
    pub pre_recording_buffer_duration: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_size: default_frame_size(),
            device: None,
            pre_recording_buffer_duration: default_pre_recording_buffer_duration(),
        }
    }
}
