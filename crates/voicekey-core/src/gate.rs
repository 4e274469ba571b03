//! Preload/Resume Gate (C9).
//!
//! Sole source of truth for "is the microphone currently live for this
//! system" (spec.md §4.9). Transitions are driven only by the Mode/Hotkey
//! Controller (C7), never by the segmenter (C3) or scheduler (C4).

use std::sync::atomic::{AtomicBool, Ordering};

/// Two states: RESUMED and PAUSED, represented as a single atomic flag.
pub struct PreloadResumeGate {
    paused: AtomicBool,
}

impl PreloadResumeGate {
    /// The system starts disarmed/paused: audio is dropped until the
    /// first arm (spec.md's design notes mirror `original_source`'s
    /// `recorder.start()` immediately followed by `recorder.pause()`).
    pub fn new() -> Self {
        Self {
            paused: AtomicBool::new(true),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }
}

impl Default for PreloadResumeGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_paused() {
        let gate = PreloadResumeGate::new();
        assert!(gate.is_paused());
    }

    #[test]
    fn resume_then_pause() {
        let gate = PreloadResumeGate::new();
        gate.resume();
        assert!(!gate.is_paused());
        gate.pause();
        assert!(gate.is_paused());
    }
}
