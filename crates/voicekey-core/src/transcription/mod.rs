//! Transcription Scheduler (C4) and its STT model collaborator (§6).

pub mod scheduler;

use async_trait::async_trait;

/// One segment returned by an STT model. Only the text matters here;
/// the model's own segmentation/timestamps are not part of this
/// system's contract.
#[derive(Debug, Clone)]
pub struct Segment {
    pub text: String,
}

/// `transcribe(audio, language, beam_size) -> iterable<Segment>`
/// (spec.md §6). The concrete model — CPU or GPU, local or remote — is
/// explicitly out of scope (spec.md §1); this trait is the seam.
#[async_trait]
pub trait SttModel: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[f32],
        language: Option<&str>,
        beam_size: u32,
    ) -> anyhow::Result<Vec<Segment>>;
}

/// `{ text, is_final, utterance_generation, produced_at }` (spec.md §3).
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub is_final: bool,
    pub utterance_generation: u64,
    pub produced_at: std::time::Instant,
}
