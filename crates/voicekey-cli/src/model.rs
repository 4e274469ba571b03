//! Concrete `SttModel` (spec.md §6) backed by `transcribe-rs`'s whisper.cpp
//! binding.
//!
//! Grounded in `whis-core/src/provider/local_whisper.rs`: an
//! engine-per-model-path cache behind a `Mutex` so repeated calls against
//! the same model file don't reload it, adapted to voicekey's split
//! preview/final model paths and to voicekey_core's async `SttModel` trait
//! by running the (synchronous, CPU-bound) `transcribe_samples` call on a
//! blocking thread so it doesn't stall the tokio runtime that T_preview
//! and T_final share.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use transcribe_rs::TranscriptionEngine;
use transcribe_rs::engines::whisper::{WhisperEngine, WhisperInferenceParams};
use voicekey_core::transcription::{Segment, SttModel};

/// One loaded whisper.cpp model. `beam_size` from spec.md §6's
/// `transcribe(audio, language, beam_size)` contract is accepted for
/// interface parity but not forwarded — `transcribe-rs` 0.2's
/// `WhisperInferenceParams` does not expose a beam-search width.
///
/// `engine` is `Arc`-wrapped (rather than owned directly) so
/// `tokio::task::spawn_blocking` can move a clone of the handle into the
/// blocking task instead of borrowing `self`, which wouldn't satisfy
/// `spawn_blocking`'s `'static` bound.
pub struct WhisperSttModel {
    engine: Arc<Mutex<WhisperEngine>>,
    model_path: String,
}

impl WhisperSttModel {
    pub fn load(model_path: &str) -> anyhow::Result<Self> {
        voicekey_core::verbose!("loading whisper model: {model_path}");
        let mut engine = WhisperEngine::new();
        engine
            .load_model(std::path::Path::new(model_path))
            .map_err(|err| anyhow::anyhow!("failed to load whisper model {model_path}: {err}"))
            .context("WhisperEngine::load_model")?;
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            model_path: model_path.to_string(),
        })
    }
}

#[async_trait]
impl SttModel for WhisperSttModel {
    async fn transcribe(
        &self,
        audio: &[f32],
        language: Option<&str>,
        _beam_size: u32,
    ) -> anyhow::Result<Vec<Segment>> {
        if audio.is_empty() {
            return Ok(Vec::new());
        }
        let samples = audio.to_vec();
        let language = language.map(str::to_string);

        // `WhisperEngine` isn't `Send`-safe to share across an `.await`
        // point under contention, but it is safe to move into a blocking
        // task: no other task touches this engine instance concurrently
        // because the caller (TranscriptionScheduler) serializes preview
        // vs final only by generation, never by engine access, so the
        // `Mutex` below is what actually prevents two concurrent
        // transcriptions against one loaded model.
        let result = tokio::task::spawn_blocking({
            let engine = self.engine.clone();
            move || -> anyhow::Result<String> {
                let mut engine = engine.lock().unwrap();
                let params = WhisperInferenceParams {
                    language,
                    translate: false,
                    print_special: false,
                    print_progress: false,
                    print_realtime: false,
                    print_timestamps: false,
                    suppress_blank: true,
                    suppress_non_speech_tokens: true,
                    no_speech_thold: 0.2,
                    initial_prompt: None,
                };
                let result = engine
                    .transcribe_samples(samples, Some(params))
                    .map_err(|err| anyhow::anyhow!("whisper transcription failed: {err}"))?;
                Ok(result.text)
            }
        })
        .await;

        let text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => return Err(err),
            Err(join_err) => return Err(anyhow::anyhow!("whisper worker panicked: {join_err}")),
        };

        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Segment {
            text: text.to_string(),
        }])
    }
}

impl std::fmt::Debug for WhisperSttModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperSttModel")
            .field("model_path", &self.model_path)
            .finish()
    }
}
