use anyhow::Context;
use voice_activity_detector::VoiceActivityDetector;

use super::Precise;

/// Silero's minimum window size at 16kHz (spec.md §4.1).
const MIN_WINDOW_SAMPLES: usize = 512;

/// voice_activity_detector (Silero)-backed precise stage. Only invoked
/// when the coarse stage has already said "maybe speech".
pub struct PreciseVad {
    detector: VoiceActivityDetector,
}

impl PreciseVad {
    pub fn new(sample_rate: u32) -> anyhow::Result<Self> {
        let detector = VoiceActivityDetector::builder()
            .sample_rate(sample_rate as i64)
            .chunk_size(MIN_WINDOW_SAMPLES)
            .build()
            .context("failed to build precise VAD detector")?;
        Ok(Self { detector })
    }
}

impl Precise for PreciseVad {
    fn probability(&mut self, frame: &[f32]) -> anyhow::Result<f32> {
        if frame.len() >= MIN_WINDOW_SAMPLES {
            Ok(self.detector.predict(frame.iter().copied()))
        } else {
            let mut padded = frame.to_vec();
            padded.resize(MIN_WINDOW_SAMPLES, 0.0);
            Ok(self.detector.predict(padded.into_iter()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_frame_is_zero_padded_not_rejected() {
        let mut vad = PreciseVad::new(16_000).unwrap();
        let result = vad.probability(&[0.0; 100]);
        assert!(result.is_ok());
    }
}
