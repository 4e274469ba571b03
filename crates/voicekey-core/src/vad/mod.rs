//! Two-stage VAD Gate (C1).

mod coarse;
mod precise;

pub use coarse::CoarseVad;
pub use precise::PreciseVad;

/// Outcome of classifying one frame. `confidence` is 0.0 when the coarse
/// stage rejected the frame without consulting the precise stage
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadVerdict {
    pub is_speech: bool,
    pub confidence: f32,
}

impl VadVerdict {
    pub fn silence() -> Self {
        Self {
            is_speech: false,
            confidence: 0.0,
        }
    }
}

/// Coarse classifier: sees a canonical 480-sample (30ms @16kHz) int16
/// sub-window, fails open on internal error (spec.md §4.1, §7).
pub trait Coarse {
    fn classify(&mut self, frame: &[f32], sample_rate: u32) -> bool;
}

/// Precise classifier: sees the full frame zero-padded to its minimum
/// window, returns a probability (spec.md §4.1).
pub trait Precise {
    fn probability(&mut self, frame: &[f32]) -> anyhow::Result<f32>;
}

/// Observability counters. Never load-bearing (spec.md §4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct VadStats {
    pub coarse_calls: u64,
    pub precise_calls: u64,
    pub speech_events: u64,
}

/// Two-stage VAD gate: coarse culls obvious silence, precise verifies
/// what's left (spec.md §4.1). Single-threaded; reentrancy is not
/// required, so this type is intentionally `!Send`/`!Sync` (the coarse
/// stage wraps `webrtc_vad::Vad`, which isn't thread-safe either).
pub struct VadGate<C: Coarse, P: Precise> {
    coarse: C,
    precise: P,
    silero_sensitivity: f32,
    stats: VadStats,
}

impl<C: Coarse, P: Precise> VadGate<C, P> {
    pub fn new(coarse: C, precise: P, silero_sensitivity: f32) -> Self {
        Self {
            coarse,
            precise,
            silero_sensitivity,
            stats: VadStats::default(),
        }
    }

    pub fn stats(&self) -> VadStats {
        self.stats
    }

    /// Classify one frame. Coarse stage gates precise; precise stage's
    /// error degrades the frame to non-speech (fail-closed), coarse
    /// stage's failure is handled inside `Coarse::classify` itself
    /// (fail-open, per spec.md §7).
    pub fn classify(&mut self, frame: &[f32], sample_rate: u32) -> VadVerdict {
        self.stats.coarse_calls += 1;
        if !self.coarse.classify(frame, sample_rate) {
            return VadVerdict::silence();
        }

        self.stats.precise_calls += 1;
        let probability = match self.precise.probability(frame) {
            Ok(p) => p,
            Err(err) => {
                crate::warn!("precise VAD stage error, treating frame as non-speech: {err}");
                return VadVerdict::silence();
            }
        };

        let is_speech = probability > self.silero_sensitivity;
        if is_speech {
            self.stats.speech_events += 1;
        }
        VadVerdict {
            is_speech,
            confidence: probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSpeech;
    impl Coarse for AlwaysSpeech {
        fn classify(&mut self, _frame: &[f32], _sample_rate: u32) -> bool {
            true
        }
    }

    struct FixedProb(f32);
    impl Precise for FixedProb {
        fn probability(&mut self, _frame: &[f32]) -> anyhow::Result<f32> {
            Ok(self.0)
        }
    }

    struct NeverSpeech;
    impl Coarse for NeverSpeech {
        fn classify(&mut self, _frame: &[f32], _sample_rate: u32) -> bool {
            false
        }
    }

    #[test]
    fn coarse_rejection_skips_precise_stage() {
        let mut gate = VadGate::new(NeverSpeech, FixedProb(0.99), 0.05);
        let verdict = gate.classify(&[0.0; 512], 16_000);
        assert!(!verdict.is_speech);
        assert_eq!(verdict.confidence, 0.0);
        assert_eq!(gate.stats().precise_calls, 0);
    }

    #[test]
    fn precise_stage_compares_against_threshold() {
        let mut gate = VadGate::new(AlwaysSpeech, FixedProb(0.1), 0.05);
        let verdict = gate.classify(&[0.0; 512], 16_000);
        assert!(verdict.is_speech);
        assert_eq!(gate.stats().precise_calls, 1);

        let mut gate = VadGate::new(AlwaysSpeech, FixedProb(0.01), 0.05);
        let verdict = gate.classify(&[0.0; 512], 16_000);
        assert!(!verdict.is_speech);
    }

    struct ErroringPrecise;
    impl Precise for ErroringPrecise {
        fn probability(&mut self, _frame: &[f32]) -> anyhow::Result<f32> {
            anyhow::bail!("model unavailable")
        }
    }

    #[test]
    fn precise_error_fails_closed() {
        let mut gate = VadGate::new(AlwaysSpeech, ErroringPrecise, 0.05);
        let verdict = gate.classify(&[0.0; 512], 16_000);
        assert!(!verdict.is_speech);
    }
}
