use serde::{Deserialize, Serialize};

fn default_realtime_processing_pause() -> f32 {
    0.02
}

fn default_beam_size() -> u32 {
    5
}

fn default_beam_size_realtime() -> u32 {
    3
}

fn default_type_realtime_preview() -> bool {
    true
}

/// Transcription scheduler settings (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// Minimum interval between preview requests on the same open
    /// utterance, in seconds.
    #[serde(default = "default_realtime_processing_pause")]
    pub realtime_processing_pause: f32,

    /// Beam size for the final (slow) model.
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,

    /// Beam size for the preview (fast) model.
    #[serde(default = "default_beam_size_realtime")]
    pub beam_size_realtime: u32,

    /// Transcription language hint, passed through to the STT model.
    #[serde(default)]
    pub language: Option<String>,

    /// Whether preview transcripts are typed at all. When false, C5
    /// never enqueues `TypePreview` tasks.
    #[serde(default = "default_type_realtime_preview")]
    pub type_realtime_preview: bool,

    /// Path to the model file backing the authoritative final pass
    /// (spec.md §6's STT model is an external collaborator; this is
    /// this binary's concern, grounded in `whis-core`'s
    /// `whisper_model_path` settings field). `None` until the user
    /// configures one.
    #[serde(default)]
    pub final_model_path: Option<String>,

    /// Path to the model file backing the fast preview pass. Falls back
    /// to `final_model_path` when unset, trading preview latency for one
    /// fewer model file to manage.
    #[serde(default)]
    pub preview_model_path: Option<String>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            realtime_processing_pause: default_realtime_processing_pause(),
            beam_size: default_beam_size(),
            beam_size_realtime: default_beam_size_realtime(),
            language: None,
            type_realtime_preview: default_type_realtime_preview(),
            final_model_path: None,
            preview_model_path: None,
        }
    }
}
