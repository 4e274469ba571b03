//! Utterance Segmenter (C3).
//!
//! A pure state machine over `(frame, VadVerdict)` pairs so spec.md §8's
//! properties 1-3 can be asserted directly against it, independent of the
//! threads that feed it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use crate::audio::frame::Frame;
use crate::vad::VadVerdict;

/// A growing append-only sequence of frames for one speech segment
/// (spec.md §3).
pub struct Utterance {
    pub started_at: Instant,
    pub frames: Vec<Frame>,
    pub silence_run: u32,
    /// Incremented each time the scheduler (C4) re-requests Final on
    /// this utterance; shared so a late-arriving Transcript can be
    /// compared against the current value and dropped if stale.
    pub generation: Arc<AtomicU64>,
    /// Flipped by the Mode/Hotkey Controller on disarm; checked by the
    /// scheduler's workers at their yield points (spec.md §5).
    pub cancelled: Arc<AtomicBool>,
}

impl Utterance {
    fn new(preroll: Vec<Frame>) -> Self {
        Self {
            started_at: Instant::now(),
            frames: preroll,
            silence_run: 0,
            generation: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn concatenated(&self) -> Vec<f32> {
        self.frames.iter().flat_map(|f| f.iter().copied()).collect()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

/// What happened as a result of feeding one frame to the segmenter.
pub enum SegmenterOutput {
    /// No transition; the frame was appended (or dropped, if Idle).
    None,
    /// Idle -> Recording transition just occurred.
    RecordingStarted,
    /// Recording -> Closing -> Idle with the minimum-duration gate
    /// passing: `on_recording_stop` fires and the utterance is handed
    /// to the Transcription Scheduler (C4).
    UtteranceClosed(Utterance),
    /// Recording -> Closing -> Idle with the gate failing: the
    /// utterance is silently discarded, no events fire beyond the
    /// `RecordingStarted` that already fired at open (spec.md §4.3,
    /// Testable Property 3).
    UtteranceDiscarded,
}

enum State {
    Idle,
    Recording(Utterance),
}

/// The Utterance Segmenter state machine (C3).
pub struct UtteranceSegmenter {
    state: State,
    sample_rate: u32,
    frame_size: usize,
    post_speech_silence_duration: f32,
    min_length_of_recording: f32,
}

impl UtteranceSegmenter {
    pub fn new(
        sample_rate: u32,
        frame_size: usize,
        post_speech_silence_duration: f32,
        min_length_of_recording: f32,
    ) -> Self {
        Self {
            state: State::Idle,
            sample_rate,
            frame_size,
            post_speech_silence_duration,
            min_length_of_recording,
        }
    }

    fn silence_threshold_frames(&self) -> u32 {
        let frames_per_second = self.sample_rate as f32 / self.frame_size as f32;
        (frames_per_second * self.post_speech_silence_duration).ceil() as u32
    }

    /// Feed one captured frame. `preroll_snapshot` is only consulted on
    /// an Idle -> Recording transition.
    pub fn on_frame(
        &mut self,
        frame: Frame,
        verdict: VadVerdict,
        preroll_snapshot: Vec<Frame>,
    ) -> SegmenterOutput {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {
                if verdict.is_speech {
                    let mut utterance = Utterance::new(preroll_snapshot);
                    utterance.frames.push(frame);
                    self.state = State::Recording(utterance);
                    SegmenterOutput::RecordingStarted
                } else {
                    // Pre-roll already absorbed this frame on the capture
                    // side; nothing else to do while idle.
                    SegmenterOutput::None
                }
            }
            State::Recording(mut utterance) => {
                utterance.frames.push(frame);
                if verdict.is_speech {
                    utterance.silence_run = 0;
                } else {
                    utterance.silence_run += 1;
                }

                if utterance.silence_run >= self.silence_threshold_frames() {
                    // Closing.
                    let duration = utterance.duration().as_secs_f32();
                    if duration < self.min_length_of_recording {
                        SegmenterOutput::UtteranceDiscarded
                    } else {
                        SegmenterOutput::UtteranceClosed(utterance)
                    }
                } else {
                    self.state = State::Recording(utterance);
                    SegmenterOutput::None
                }
            }
        }
    }

    /// Disarm mid-utterance: disarm wins over any in-flight open
    /// (spec.md §4.3 tie-break). Clears segmenter state back to Idle and
    /// returns the half-formed utterance, if any, so the caller can mark
    /// it cancelled.
    pub fn disarm(&mut self) -> Option<Utterance> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => None,
            State::Recording(utterance) => Some(utterance),
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording(_))
    }

    /// Snapshot of the currently-open utterance's audio and shared
    /// generation/cancel tokens, used by the capture loop to issue preview
    /// requests while recording is still in progress (spec.md §4.4).
    /// `None` while Idle.
    pub fn current_snapshot(&self) -> Option<(Vec<f32>, Arc<AtomicU64>, Arc<AtomicBool>)> {
        match &self.state {
            State::Idle => None,
            State::Recording(utterance) => Some((
                utterance.concatenated(),
                utterance.generation.clone(),
                utterance.cancelled.clone(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> Frame {
        Arc::from(vec![0.0_f32; n])
    }

    fn speech(conf: f32) -> VadVerdict {
        VadVerdict {
            is_speech: true,
            confidence: conf,
        }
    }

    fn silence() -> VadVerdict {
        VadVerdict::silence()
    }

    #[test]
    fn idle_ignores_silence() {
        let mut seg = UtteranceSegmenter::new(16_000, 512, 0.5, 0.3);
        let out = seg.on_frame(frame(512), silence(), vec![]);
        assert!(matches!(out, SegmenterOutput::None));
        assert!(!seg.is_recording());
    }

    #[test]
    fn idle_to_recording_on_speech_snapshots_preroll() {
        let mut seg = UtteranceSegmenter::new(16_000, 512, 0.5, 0.3);
        let preroll = vec![frame(512), frame(512)];
        let out = seg.on_frame(frame(512), speech(0.9), preroll);
        assert!(matches!(out, SegmenterOutput::RecordingStarted));
        assert!(seg.is_recording());
    }

    // Property 2: silence-gated closure fires exactly when silence_run
    // first reaches the threshold, never earlier.
    #[test]
    fn closes_exactly_at_silence_threshold() {
        // 16kHz / 512 samples = 31.25 frames/sec; 0.1s => ceil(3.125) = 4 frames
        let mut seg = UtteranceSegmenter::new(16_000, 512, 0.1, 0.0);
        seg.on_frame(frame(512), speech(0.9), vec![]);

        for _ in 0..3 {
            let out = seg.on_frame(frame(512), silence(), vec![]);
            assert!(matches!(out, SegmenterOutput::None), "closed too early");
        }
        let out = seg.on_frame(frame(512), silence(), vec![]);
        assert!(matches!(
            out,
            SegmenterOutput::UtteranceClosed(_) | SegmenterOutput::UtteranceDiscarded
        ));
    }

    // Property 3: utterances shorter than min_length_of_recording produce
    // no Transcript (discarded), but RecordingStarted still fired at open.
    #[test]
    fn short_utterance_is_discarded_after_recording_started() {
        let mut seg = UtteranceSegmenter::new(16_000, 512, 0.05, 10.0);
        let start = seg.on_frame(frame(512), speech(0.9), vec![]);
        assert!(matches!(start, SegmenterOutput::RecordingStarted));

        let out = seg.on_frame(frame(512), silence(), vec![]);
        assert!(matches!(out, SegmenterOutput::UtteranceDiscarded));
    }

    #[test]
    fn silence_run_resets_on_speech_resumption() {
        let mut seg = UtteranceSegmenter::new(16_000, 512, 0.2, 0.0);
        seg.on_frame(frame(512), speech(0.9), vec![]);
        seg.on_frame(frame(512), silence(), vec![]);
        let out = seg.on_frame(frame(512), speech(0.9), vec![]);
        assert!(matches!(out, SegmenterOutput::None));
        assert!(seg.is_recording());
    }

    #[test]
    fn disarm_mid_utterance_returns_half_formed_utterance() {
        let mut seg = UtteranceSegmenter::new(16_000, 512, 0.5, 0.0);
        seg.on_frame(frame(512), speech(0.9), vec![]);
        let utterance = seg.disarm();
        assert!(utterance.is_some());
        assert!(!seg.is_recording());
    }
}
