//! Transcription Scheduler (C4).
//!
//! Dispatches the fast ("preview") and slow ("final") models concurrently
//! over the same growing utterance buffer (spec.md §4.4). Each request
//! carries its own copy of the audio and the utterance's shared
//! `generation`/`cancelled` tokens (spec.md §9's per-utterance cancel
//! token), so workers never need a lock on the utterance itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::{Segment, SttModel, Transcript};

fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Dispatches preview and final requests against their respective models
/// (spec.md §4.4). Holds no utterance state itself — callers pass in the
/// audio snapshot plus the utterance's shared generation/cancel tokens.
pub struct TranscriptionScheduler<P: SttModel, F: SttModel> {
    preview_model: Arc<P>,
    final_model: Arc<F>,
    language: Option<String>,
    preview_beam_size: u32,
    final_beam_size: u32,
    realtime_processing_pause: Duration,
}

impl<P: SttModel, F: SttModel> TranscriptionScheduler<P, F> {
    pub fn new(
        preview_model: Arc<P>,
        final_model: Arc<F>,
        language: Option<String>,
        preview_beam_size: u32,
        final_beam_size: u32,
        realtime_processing_pause: Duration,
    ) -> Self {
        Self {
            preview_model,
            final_model,
            language,
            preview_beam_size,
            final_beam_size,
            realtime_processing_pause,
        }
    }

    /// Minimum gap between successive preview requests on the same
    /// utterance (spec.md §4.4: "at most once per `realtime_processing_pause`").
    /// Callers (the capture/segmenter loop) own the actual throttling.
    pub fn preview_throttle(&self) -> Duration {
        self.realtime_processing_pause
    }

    /// Run the fast model over `audio` and, if its text is new and the
    /// utterance hasn't closed or been cancelled out from under it, return
    /// a preview `Transcript`. Returns `None` when cancelled, stale, or
    /// unchanged from `last_text` (spec.md §4.4).
    pub async fn request_preview(
        &self,
        audio: Vec<f32>,
        generation: &Arc<AtomicU64>,
        cancelled: &Arc<AtomicBool>,
        last_text: &str,
    ) -> Option<Transcript> {
        if cancelled.load(Ordering::SeqCst) {
            return None;
        }
        let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;

        let segments = match self
            .preview_model
            .transcribe(&audio, self.language.as_deref(), self.preview_beam_size)
            .await
        {
            Ok(segments) => segments,
            Err(err) => {
                crate::warn!("preview model error, treating as empty transcript: {err}");
                Vec::new()
            }
        };
        let text = join_segments(&segments);

        if cancelled.load(Ordering::SeqCst) {
            return None;
        }
        // A newer preview (or the closing final) has already superseded
        // this request; our result arrived late.
        if generation.load(Ordering::SeqCst) != my_generation {
            return None;
        }
        if text.is_empty() || text == last_text {
            return None;
        }

        Some(Transcript {
            text,
            is_final: false,
            utterance_generation: my_generation,
            produced_at: Instant::now(),
        })
    }

    /// Run the slow model over the full utterance. Fired exactly once,
    /// when the segmenter closes the utterance (spec.md §4.4). Never
    /// dropped for staleness — only cancellation suppresses it.
    pub async fn request_final(
        &self,
        audio: Vec<f32>,
        generation: &Arc<AtomicU64>,
        cancelled: &Arc<AtomicBool>,
    ) -> Option<Transcript> {
        if cancelled.load(Ordering::SeqCst) {
            return None;
        }
        let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;

        let segments = match self
            .final_model
            .transcribe(&audio, self.language.as_deref(), self.final_beam_size)
            .await
        {
            Ok(segments) => segments,
            Err(err) => {
                crate::warn!("final model error, treating as empty transcript: {err}");
                Vec::new()
            }
        };
        let text = join_segments(&segments);

        if cancelled.load(Ordering::SeqCst) {
            return None;
        }

        Some(Transcript {
            text,
            is_final: true,
            utterance_generation: my_generation,
            produced_at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FixedModel {
        text: String,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SttModel for FixedModel {
        async fn transcribe(
            &self,
            _audio: &[f32],
            _language: Option<&str>,
            _beam_size: u32,
        ) -> anyhow::Result<Vec<Segment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Segment {
                text: self.text.clone(),
            }])
        }
    }

    struct ErroringModel;

    #[async_trait]
    impl SttModel for ErroringModel {
        async fn transcribe(
            &self,
            _audio: &[f32],
            _language: Option<&str>,
            _beam_size: u32,
        ) -> anyhow::Result<Vec<Segment>> {
            anyhow::bail!("model crashed")
        }
    }

    fn scheduler(
        preview_text: &str,
        final_text: &str,
    ) -> TranscriptionScheduler<FixedModel, FixedModel> {
        TranscriptionScheduler::new(
            Arc::new(FixedModel::new(preview_text)),
            Arc::new(FixedModel::new(final_text)),
            None,
            1,
            5,
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn preview_emits_when_text_changes() {
        let sched = scheduler("hello world", "hello world");
        let generation = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        let transcript = sched
            .request_preview(vec![0.0; 10], &generation, &cancelled, "")
            .await
            .expect("should emit");
        assert_eq!(transcript.text, "hello world");
        assert!(!transcript.is_final);
    }

    #[tokio::test]
    async fn preview_suppressed_when_unchanged() {
        let sched = scheduler("hello world", "hello world");
        let generation = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        let transcript = sched
            .request_preview(vec![0.0; 10], &generation, &cancelled, "hello world")
            .await;
        assert!(transcript.is_none());
    }

    // Testable Property 8 / Scenario S6: cancellation before submission
    // suppresses the model call entirely.
    #[tokio::test]
    async fn cancelled_before_submit_skips_model_call() {
        let sched = scheduler("hello", "hello");
        let generation = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::new(AtomicBool::new(true));

        let result = sched
            .request_final(vec![0.0; 10], &generation, &cancelled)
            .await;
        assert!(result.is_none());
    }

    // A newer preview request supersedes an older, slower one still in
    // flight: the older one's result must not be emitted.
    #[tokio::test]
    async fn stale_generation_is_dropped() {
        let sched = scheduler("stale text", "final");
        let generation = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        // Simulate a newer request having already bumped the generation
        // past what this call will observe as "mine".
        generation.fetch_add(5, Ordering::SeqCst);

        let result = sched
            .request_preview(vec![0.0; 10], &generation, &cancelled, "")
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn model_error_is_treated_as_empty_transcript() {
        let sched = TranscriptionScheduler::new(
            Arc::new(ErroringModel),
            Arc::new(ErroringModel),
            None,
            1,
            5,
            Duration::from_millis(20),
        );
        let generation = Arc::new(AtomicU64::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));

        let result = sched
            .request_final(vec![0.0; 10], &generation, &cancelled)
            .await;
        // Empty text is still a valid (non-cancelled) final outcome; the
        // pipeline continues rather than propagating the model's error.
        assert_eq!(result.unwrap().text, "");
    }
}
