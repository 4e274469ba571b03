use std::collections::VecDeque;
use std::sync::Arc;

/// A contiguous block of mono PCM samples, float, -1.0..1.0 (spec.md §3).
pub type Frame = Arc<[f32]>;

/// Fixed-capacity ring of the most recently captured frames, held so an
/// utterance can be opened with audio from strictly before the first
/// speech frame.
///
/// Invariant: PreRoll holds only audio strictly prior to the current
/// utterance onset — frames are pushed here before the segmenter has
/// decided an utterance is open, and the segmenter snapshots (not drains)
/// this ring on open.
pub struct PreRoll {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl PreRoll {
    /// `capacity` frames such that `capacity * frame_size / sample_rate >=
    /// pre_recording_buffer_duration`.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Shallow copy of the held frame references, oldest first.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.frames.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Computes the PreRoll capacity, in frames, for a given duration.
pub fn preroll_capacity(sample_rate: u32, frame_size: usize, duration_secs: f32) -> usize {
    let frames_per_second = sample_rate as f32 / frame_size as f32;
    (frames_per_second * duration_secs).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preroll_evicts_oldest() {
        let mut ring = PreRoll::new(2);
        ring.push(Arc::from(vec![1.0_f32]));
        ring.push(Arc::from(vec![2.0_f32]));
        ring.push(Arc::from(vec![3.0_f32]));
        let snap = ring.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0][0], 2.0);
        assert_eq!(snap[1][0], 3.0);
    }

    #[test]
    fn capacity_covers_duration() {
        // 16kHz, 512-sample frames => 31.25 frames/sec; 1.0s => 32 frames
        let cap = preroll_capacity(16_000, 512, 1.0);
        assert_eq!(cap, 32);
    }
}
