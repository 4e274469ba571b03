//! Audio Capture (C2).
//!
//! The cpal device callback only converts and forwards raw samples; it
//! must stay non-blocking and Send, and `webrtc_vad::Vad` (inside the
//! VAD gate) is not `Send`. So the pipeline-facing part of C2 — gate
//! check, PreRoll append, VAD classification, handoff to the segmenter —
//! runs on a dedicated capture thread that drains a channel fed by the
//! cpal callback, not inside the callback itself. Both together make up
//! the T_capture role of spec.md §5.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, bounded};

use super::frame::{Frame, PreRoll, preroll_capacity};
use crate::error::AudioError;
use crate::gate::PreloadResumeGate;
use crate::vad::{CoarseVad, PreciseVad, VadGate, VadVerdict};

/// One frame plus its VAD verdict, handed to the segmenter in arrival
/// order (spec.md §4.2 step 3).
///
/// `preroll_snapshot` is the PreRoll's contents strictly prior to this
/// frame (a shallow copy of `Arc` references, so cheap to attach to
/// every message) — the segmenter only consumes it on an Idle ->
/// Recording transition, but it must be captured here, at the instant
/// this frame arrives, to satisfy the "strictly prior to onset"
/// invariant (spec.md §3): by the time the segmenter processes this
/// frame the capture thread may already be several frames ahead.
pub struct CapturedFrame {
    pub frame: Frame,
    pub verdict: VadVerdict,
    pub preroll_snapshot: Vec<Frame>,
}

/// Owns the input stream and the dedicated capture-thread pipeline.
pub struct AudioCapture {
    stream: Option<cpal::Stream>,
    running: Arc<AtomicBool>,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start capturing. `device_substr` selects an input device whose
    /// name contains the given substring; `None` uses the host default.
    /// Returns a receiver of `CapturedFrame`s in arrival order, plus a
    /// handle to the shared PreRoll so the Mode/Hotkey Controller's
    /// disarm path can clear it (spec.md §4.7: "clear segmenter state,
    /// clear PreRoll").
    pub fn start(
        &mut self,
        device_substr: Option<&str>,
        sample_rate: u32,
        frame_size: usize,
        webrtc_sensitivity: u8,
        silero_sensitivity: f32,
        pre_recording_buffer_duration: f32,
        gate: Arc<PreloadResumeGate>,
    ) -> Result<(Receiver<CapturedFrame>, Arc<Mutex<PreRoll>>)> {
        let host = cpal::default_host();
        let device = select_device(&host, device_substr)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".to_string());
        crate::verbose!("audio device: {device_name}");

        let config = device
            .default_input_config()
            .context("failed to get default input config")?;
        let channels = config.channels();
        let device_rate = config.sample_rate().0;

        // Raw samples flow from the cpal callback to the capture thread
        // through a bounded channel; full channel means the capture
        // thread is behind, so raw chunks are dropped (spec.md §4.2:
        // "underflows/overflows... are logged and ignored").
        let (raw_tx, raw_rx) = bounded::<Vec<f32>>(64);

        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, channels, raw_tx.clone())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, channels, raw_tx.clone())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, channels, raw_tx.clone())?,
            other => {
                return Err(AudioError::UnsupportedFormat(format!("{other:?}")).into());
            }
        };
        stream.play().context("failed to start input stream")?;
        self.stream = Some(stream);
        self.running.store(true, Ordering::SeqCst);

        let (frame_tx, frame_rx) = bounded::<CapturedFrame>(256);
        let preroll_capacity = preroll_capacity(sample_rate, frame_size, pre_recording_buffer_duration);
        let preroll = Arc::new(Mutex::new(PreRoll::new(preroll_capacity.max(1))));
        let running = self.running.clone();
        let preroll_for_thread = preroll.clone();

        std::thread::Builder::new()
            .name("voicekey-capture".into())
            .spawn(move || {
                capture_thread_main(
                    raw_rx,
                    frame_tx,
                    running,
                    device_rate,
                    sample_rate,
                    frame_size,
                    webrtc_sensitivity,
                    silero_sensitivity,
                    preroll_for_thread,
                    gate,
                )
            })
            .context("failed to spawn capture thread")?;

        Ok((frame_rx, preroll))
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn select_device(host: &cpal::Host, device_substr: Option<&str>) -> Result<cpal::Device> {
    if let Some(substr) = device_substr {
        let needle = substr.to_lowercase();
        let found = host
            .input_devices()
            .context("failed to enumerate input devices")?
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
        if let Some(device) = found {
            return Ok(device);
        }
        crate::warn!("no input device matching '{substr}', falling back to default");
    }
    host.default_input_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default input device".into()).into())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: u16,
    raw_tx: Sender<Vec<f32>>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let err_fn = |err| crate::warn!("audio stream error: {err}");
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = to_mono_f32(data, channels);
                // try_send: never block the audio callback.
                if raw_tx.try_send(mono).is_err() {
                    crate::warn!("capture channel full, dropping audio chunk");
                }
            },
            err_fn,
            None,
        )
        .context("failed to build input stream")?;
    Ok(stream)
}

fn to_mono_f32<T>(data: &[T], channels: u16) -> Vec<f32>
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    if channels <= 1 {
        return data.iter().map(|&s| f32::from_sample(s)).collect();
    }
    let channels = channels as usize;
    data.chunks(channels)
        .map(|chunk| {
            let sum: f32 = chunk.iter().map(|&s| f32::from_sample(s)).sum();
            sum / chunk.len() as f32
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn capture_thread_main(
    raw_rx: Receiver<Vec<f32>>,
    frame_tx: Sender<CapturedFrame>,
    running: Arc<AtomicBool>,
    device_rate: u32,
    sample_rate: u32,
    frame_size: usize,
    webrtc_sensitivity: u8,
    silero_sensitivity: f32,
    preroll: Arc<Mutex<PreRoll>>,
    gate: Arc<PreloadResumeGate>,
) {
    let mut vad_gate = match PreciseVad::new(sample_rate) {
        Ok(precise) => VadGate::new(CoarseVad::new(webrtc_sensitivity), precise, silero_sensitivity),
        Err(err) => {
            crate::error!("failed to initialize precise VAD stage: {err}");
            return;
        }
    };

    let needs_resample = device_rate != sample_rate;
    if needs_resample {
        crate::warn!(
            "device sample rate {device_rate} != pipeline rate {sample_rate}; frames are not resampled, VAD/STT contract assumes {sample_rate} Hz input"
        );
    }

    let mut accum: Vec<f32> = Vec::with_capacity(frame_size * 2);

    while running.load(Ordering::SeqCst) {
        let Ok(chunk) = raw_rx.recv_timeout(std::time::Duration::from_millis(200)) else {
            continue;
        };
        accum.extend_from_slice(&chunk);

        while accum.len() >= frame_size {
            let frame_samples: Vec<f32> = accum.drain(..frame_size).collect();
            let frame: Frame = Arc::from(frame_samples);

            if gate.is_paused() {
                // spec.md §4.2 step 1: drop without touching PreRoll or the segmenter.
                continue;
            }

            let preroll_snapshot = {
                let mut preroll = preroll.lock().unwrap();
                let snapshot = preroll.snapshot();
                preroll.push(frame.clone());
                snapshot
            };
            let verdict = vad_gate.classify(&frame, sample_rate);

            if frame_tx
                .send(CapturedFrame {
                    frame,
                    verdict,
                    preroll_snapshot,
                })
                .is_err()
            {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mono_f32_averages_interleaved_channels() {
        let stereo: Vec<f32> = vec![1.0, -1.0, 0.5, -0.5];
        let mono = to_mono_f32(&stereo, 2);
        assert_eq!(mono, vec![0.0, 0.0]);
    }

    #[test]
    fn to_mono_f32_passes_through_single_channel() {
        let samples: Vec<f32> = vec![0.1, 0.2, 0.3];
        let mono = to_mono_f32(&samples, 1);
        assert_eq!(mono, samples);
    }
}
