//! Service wiring (spec.md §2, §5).
//!
//! This is the one place that assembles C1-C9 into the running pipeline:
//! `C2 -> C1 -> C3 -> C4 -> (C5 or C8)`, with C6 between C4 and the mode
//! dispatcher and C9 gating C2. Component behavior itself lives in each
//! component's own module; this module only owns the threads/tasks of
//! spec.md §5's scheduling model and the channels between them.
//!
//! Three threads carry state that can't cross an `.await` cheaply or
//! safely (the cpal stream, `webrtc_vad::Vad`, the segmenter's private
//! state, and the enigo/rdev backends are not meant to bounce between
//! async task polls): T_capture's pipeline-facing half and the segmenter
//! live on one dedicated OS thread, T_hotkey on another, T_type on a
//! third. T_preview, T_final, and T_agent are ordinary `tokio::spawn`
//! tasks, since `SttModel::transcribe` and subprocess I/O are genuinely
//! async collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;

use crate::agent::AgentBuffer;
use crate::audio::capture::AudioCapture;
use crate::discard;
use crate::gate::PreloadResumeGate;
use crate::keystroke::{KeyInjector, KeystrokeEngine, Task as KeystrokeTask};
use crate::mode::hotkey_chord::Hotkey;
use crate::mode::{self, ControllerEvent, HotkeyController, Mode};
use crate::segmenter::{SegmenterOutput, UtteranceSegmenter};
use crate::settings::Settings;
use crate::sound::WavSound;
use crate::transcription::scheduler::TranscriptionScheduler;
use crate::transcription::{SttModel, Transcript};

/// What the segmenter thread hands across to the async pipeline task. This
/// is the bridge between T_capture's synchronous world and T_preview/
/// T_final's async one (spec.md §5).
enum SegmenterEvent {
    RecordingStarted,
    Preview {
        audio: Vec<f32>,
        generation: Arc<AtomicU64>,
        cancelled: Arc<AtomicBool>,
    },
    Closed {
        audio: Vec<f32>,
        generation: Arc<AtomicU64>,
        cancelled: Arc<AtomicBool>,
    },
    Discarded,
}

/// Run the dictation service until its event loop ends (normally: never,
/// under a live capture stream). `preview_model`/`final_model` are the
/// dual STT collaborators of spec.md §4.4/§6; `injector` is the keystroke
/// collaborator of §6. All three are out of this crate's scope to
/// implement (spec.md §1) and are supplied by the caller (`voicekey-cli`).
///
/// Callers that need clean-shutdown-on-signal semantics (spec.md §6 CLI
/// surface) should race this future against their own signal handler;
/// this function does not install one itself, since that is a binary-
/// crate concern, not a pipeline one.
pub async fn run<P, F, I>(
    mut settings: Settings,
    preview_model: Arc<P>,
    final_model: Arc<F>,
    injector: I,
) -> anyhow::Result<()>
where
    P: SttModel + 'static,
    F: SttModel + 'static,
    I: KeyInjector + 'static,
{
    settings.validate()?;

    let gate = Arc::new(PreloadResumeGate::new());
    let sound: Arc<dyn crate::sound::Sound> = Arc::new(WavSound);
    let runtime = tokio::runtime::Handle::current();
    let controller = Arc::new(HotkeyController::new(
        &settings.hotkey,
        gate.clone(),
        sound,
        runtime.clone(),
    ));

    let hotkey = Hotkey::parse(&settings.hotkey.chord)
        .ok_or_else(|| anyhow::anyhow!("invalid hotkey chord: {}", settings.hotkey.chord))?;
    {
        let controller = controller.clone();
        std::thread::Builder::new()
            .name("voicekey-hotkey".into())
            .spawn(move || mode::listener::run(hotkey, controller))
            .context("failed to spawn hotkey listener thread")?;
    }

    // Bound for the rest of this function's scope (which only ends when
    // the event loop below ends): dropping `_capture` would tear down the
    // cpal stream out from under the running service.
    let mut _capture = AudioCapture::new();
    let (frame_rx, preroll) = _capture.start(
        settings.audio.device.as_deref(),
        settings.audio.sample_rate,
        settings.audio.frame_size,
        settings.vad.webrtc_sensitivity,
        settings.vad.silero_sensitivity,
        settings.audio.pre_recording_buffer_duration,
        gate.clone(),
    )?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SegmenterEvent>();

    spawn_segmenter_thread(
        &settings,
        frame_rx,
        preroll,
        controller.clone(),
        event_tx,
    )?;

    let scheduler = Arc::new(TranscriptionScheduler::new(
        preview_model,
        final_model,
        settings.transcription.language.clone(),
        settings.transcription.beam_size_realtime,
        settings.transcription.beam_size,
        Duration::from_secs_f32(settings.transcription.realtime_processing_pause),
    ));

    let (keystroke_tx, keystroke_rx) = crossbeam_channel::unbounded::<KeystrokeTask>();
    let keystroke_engine = KeystrokeEngine::new(
        injector,
        settings.keystroke.typing_delay_ms,
        settings.keystroke.key_hold_ms,
        settings.word_mappings.mappings.clone(),
    );
    std::thread::Builder::new()
        .name("voicekey-type".into())
        .spawn(move || keystroke_engine.run(keystroke_rx))
        .context("failed to spawn keystroke thread")?;

    let agent_buffer = Arc::new(AgentBuffer::new(&settings.agent, runtime.clone()));

    spawn_controller_event_task(controller.clone(), keystroke_tx.clone(), agent_buffer.clone());

    let type_realtime_preview = settings.transcription.type_realtime_preview;
    let discard_phrases = Arc::new(settings.discard_phrases.phrases.clone());
    let last_preview_text = Arc::new(Mutex::new(String::new()));

    while let Some(event) = event_rx.recv().await {
        match event {
            SegmenterEvent::RecordingStarted => {
                *last_preview_text.lock().unwrap() = String::new();
            }
            SegmenterEvent::Discarded => {}
            SegmenterEvent::Preview {
                audio,
                generation,
                cancelled,
            } => {
                if !type_realtime_preview {
                    continue;
                }
                let scheduler = scheduler.clone();
                let keystroke_tx = keystroke_tx.clone();
                let discard_phrases = discard_phrases.clone();
                let last_preview_text = last_preview_text.clone();
                let controller = controller.clone();
                tokio::spawn(async move {
                    let last_text = last_preview_text.lock().unwrap().clone();
                    let Some(transcript) = scheduler
                        .request_preview(audio, &generation, &cancelled, &last_text)
                        .await
                    else {
                        return;
                    };
                    // Mode may have rotated while the preview model ran;
                    // only Listen mode consumes previews (spec.md §4.5's
                    // C5 is "single consumer... in LISTEN mode").
                    if controller.mode() != Mode::Listen {
                        return;
                    }
                    if discard::should_discard(&transcript.text, &discard_phrases) {
                        return;
                    }
                    *last_preview_text.lock().unwrap() = transcript.text.clone();
                    let _ = keystroke_tx.send(KeystrokeTask::TypePreview(transcript.text));
                });
            }
            SegmenterEvent::Closed {
                audio,
                generation,
                cancelled,
            } => {
                let scheduler = scheduler.clone();
                let keystroke_tx = keystroke_tx.clone();
                let agent_buffer = agent_buffer.clone();
                let controller = controller.clone();
                let discard_phrases = discard_phrases.clone();
                tokio::spawn(async move {
                    let Some(transcript) =
                        scheduler.request_final(audio, &generation, &cancelled).await
                    else {
                        return;
                    };
                    dispatch_final(transcript, &controller, &keystroke_tx, &agent_buffer, &discard_phrases);
                });
            }
        }
    }

    Ok(())
}

/// Route a committed final transcript to whichever consumer the current
/// mode selects (spec.md §2 data flow: C4 -> C6 -> (C5 or C8)). An empty
/// final (the model returned no segments) elides typing entirely,
/// including the trailing space (spec.md §9's resolved Open Question).
fn dispatch_final(
    transcript: Transcript,
    controller: &HotkeyController,
    keystroke_tx: &crossbeam_channel::Sender<KeystrokeTask>,
    agent_buffer: &Arc<AgentBuffer>,
    discard_phrases: &HashSet<String>,
) {
    if transcript.text.is_empty() {
        return;
    }
    if discard::should_discard(&transcript.text, discard_phrases) {
        crate::verbose!("discarding final transcript: {:?}", transcript.text);
        return;
    }
    match controller.mode() {
        Mode::Listen => {
            let _ = keystroke_tx.send(KeystrokeTask::TypeFinal(transcript.text));
        }
        Mode::Agent => agent_buffer.append(&transcript.text),
    }
}

/// Subscribes to the controller's events and translates the ones that
/// affect the keystroke engine / agent buffer but aren't segmenter-local
/// (spec.md §4.7: disarm flushes preview and discards the agent buffer;
/// any mode rotation flushes residual Listen-mode preview first).
fn spawn_controller_event_task(
    controller: Arc<HotkeyController>,
    keystroke_tx: crossbeam_channel::Sender<KeystrokeTask>,
    agent_buffer: Arc<AgentBuffer>,
) {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ControllerEvent::Disarmed) => {
                    let _ = keystroke_tx.send(KeystrokeTask::FlushPreview);
                    agent_buffer.discard();
                }
                Ok(ControllerEvent::ModeChanged(_)) => {
                    let _ = keystroke_tx.send(KeystrokeTask::FlushPreview);
                }
                Ok(ControllerEvent::Armed) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Spawns the dedicated thread that owns the Utterance Segmenter (C3) and
/// throttles preview requests (spec.md §4.4: "at most once per
/// `realtime_processing_pause`"), driven by a `recv_timeout` on the frame
/// channel doing double duty as both "new frame arrived" and "preview
/// tick due".
fn spawn_segmenter_thread(
    settings: &Settings,
    frame_rx: crossbeam_channel::Receiver<crate::audio::capture::CapturedFrame>,
    preroll: Arc<Mutex<crate::audio::frame::PreRoll>>,
    controller: Arc<HotkeyController>,
    event_tx: mpsc::UnboundedSender<SegmenterEvent>,
) -> anyhow::Result<()> {
    let sample_rate = settings.audio.sample_rate;
    let frame_size = settings.audio.frame_size;
    let post_speech_silence_duration = settings.vad.post_speech_silence_duration;
    let min_length_of_recording = settings.vad.min_length_of_recording;
    let preview_interval =
        Duration::from_secs_f32(settings.transcription.realtime_processing_pause.max(0.001));

    std::thread::Builder::new()
        .name("voicekey-segmenter".into())
        .spawn(move || {
            let mut segmenter = UtteranceSegmenter::new(
                sample_rate,
                frame_size,
                post_speech_silence_duration,
                min_length_of_recording,
            );
            let mut disarm_rx = controller.subscribe();

            loop {
                // Disarm wins over any in-flight open (spec.md §4.3
                // tie-break): drain pending controller events before
                // acting on the next frame.
                while let Ok(event) = disarm_rx.try_recv() {
                    if event == ControllerEvent::Disarmed {
                        if let Some(utterance) = segmenter.disarm() {
                            utterance.cancelled.store(true, Ordering::SeqCst);
                        }
                        preroll.lock().unwrap().clear();
                    }
                }

                match frame_rx.recv_timeout(preview_interval) {
                    Ok(captured) => {
                        let output = segmenter.on_frame(
                            captured.frame,
                            captured.verdict,
                            captured.preroll_snapshot,
                        );
                        match output {
                            SegmenterOutput::None => {}
                            SegmenterOutput::RecordingStarted => {
                                crate::verbose!("on_recording_start");
                                let _ = event_tx.send(SegmenterEvent::RecordingStarted);
                            }
                            SegmenterOutput::UtteranceDiscarded => {
                                let _ = event_tx.send(SegmenterEvent::Discarded);
                            }
                            SegmenterOutput::UtteranceClosed(utterance) => {
                                crate::verbose!("on_recording_stop");
                                let _ = event_tx.send(SegmenterEvent::Closed {
                                    audio: utterance.concatenated(),
                                    generation: utterance.generation.clone(),
                                    cancelled: utterance.cancelled.clone(),
                                });
                            }
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        if let Some((audio, generation, cancelled)) = segmenter.current_snapshot() {
                            let _ = event_tx.send(SegmenterEvent::Preview {
                                audio,
                                generation,
                                cancelled,
                            });
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .context("failed to spawn segmenter thread")?;
    Ok(())
}
