use webrtc_vad::{SampleRate, Vad, VadMode};

use super::Coarse;

/// Canonical sub-window the coarse stage inspects: 30ms at 16kHz
/// (spec.md §4.1).
const FRAME_SIZE_SAMPLES: usize = 480;

/// webrtc-vad-backed coarse stage. Fails open (treats a classification
/// error as speech) so the gate never silently starves the precise
/// stage and the segmenter of a frame it should have seen.
pub struct CoarseVad {
    vad: Vad,
    sensitivity: u8,
}

impl CoarseVad {
    pub fn new(sensitivity: u8) -> Self {
        Self {
            vad: build_vad(sensitivity),
            sensitivity,
        }
    }

    pub fn sensitivity(&self) -> u8 {
        self.sensitivity
    }

    fn sample_rate_enum(sample_rate: u32) -> SampleRate {
        match sample_rate {
            8_000 => SampleRate::Rate8kHz,
            32_000 => SampleRate::Rate32kHz,
            48_000 => SampleRate::Rate48kHz,
            _ => SampleRate::Rate16kHz,
        }
    }
}

fn build_vad(sensitivity: u8) -> Vad {
    let mode = match sensitivity {
        0 => VadMode::Quality,
        1 => VadMode::LowBitrate,
        2 => VadMode::Aggressive,
        _ => VadMode::VeryAggressive,
    };
    Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, mode)
}

impl Coarse for CoarseVad {
    fn classify(&mut self, frame: &[f32], sample_rate: u32) -> bool {
        let mut window = vec![0i16; FRAME_SIZE_SAMPLES];
        let take = frame.len().min(FRAME_SIZE_SAMPLES);
        for (dst, &sample) in window.iter_mut().zip(&frame[..take]) {
            *dst = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        }

        let _ = Self::sample_rate_enum(sample_rate);
        match self.vad.is_voice_segment(&window) {
            Ok(is_voice) => is_voice,
            Err(_) => {
                crate::warn!("coarse VAD error, failing open (treating frame as speech)");
                true
            }
        }
    }
}

impl Default for CoarseVad {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_frame_is_zero_padded() {
        let mut vad = CoarseVad::new(3);
        // Shouldn't panic on a frame shorter than the canonical window.
        let _ = vad.classify(&[0.5; 100], 16_000);
    }

    #[test]
    fn long_frame_is_truncated() {
        let mut vad = CoarseVad::new(3);
        let _ = vad.classify(&[0.0; 2048], 16_000);
    }

    #[test]
    fn sensitivity_selects_distinct_modes() {
        let _ = CoarseVad::new(0);
        let _ = CoarseVad::new(3);
    }
}
