//! Mode / Hotkey Controller (C7).
//!
//! Single global chord, single-tap (toggle armed/disarmed) vs double-tap
//! (rotate LISTEN <-> AGENT) semantics (spec.md §4.7). Rather than storing
//! callbacks, the controller publishes `ControllerEvent`s on a broadcast
//! channel that other components subscribe to — this breaks the source's
//! callback-field coupling (spec.md §9) without losing behavior: C3/C2
//! react to `Disarmed` by clearing the segmenter and PreRoll, C5 reacts to
//! `ModeChanged`/`Disarmed` by flushing preview state, C8 reacts to
//! `Disarmed` by discarding its buffer.

pub mod hotkey_chord;
pub mod listener;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::gate::PreloadResumeGate;
use crate::settings::HotkeySettings;
use crate::sound::Sound;

/// `{ Listen, Agent }` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Listen,
    Agent,
}

impl Mode {
    fn rotate(self) -> Self {
        match self {
            Mode::Listen => Mode::Agent,
            Mode::Agent => Mode::Listen,
        }
    }
}

/// Published on arm/disarm/rotate so other components can react without the
/// controller needing direct references to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Armed,
    Disarmed,
    ModeChanged(Mode),
}

/// The Mode/Hotkey Controller (C7). Owns the Preload/Resume Gate's
/// arm/disarm transitions; everything else downstream reacts to its events.
pub struct HotkeyController {
    mode: Mutex<Mode>,
    armed: AtomicBool,
    last_tap_at: Mutex<Option<Instant>>,
    pending_timer: Mutex<Option<JoinHandle<()>>>,
    gate: Arc<PreloadResumeGate>,
    sound: Arc<dyn Sound>,
    sounds_enabled: bool,
    sound_on_listening_start: String,
    sound_on_listening_stop: String,
    double_tap_window: Duration,
    listening_state_delay: Duration,
    events: broadcast::Sender<ControllerEvent>,
    runtime: tokio::runtime::Handle,
}

impl HotkeyController {
    pub fn new(
        settings: &HotkeySettings,
        gate: Arc<PreloadResumeGate>,
        sound: Arc<dyn Sound>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (events, _rx) = broadcast::channel(32);
        Self {
            mode: Mutex::new(Mode::Listen),
            armed: AtomicBool::new(false),
            last_tap_at: Mutex::new(None),
            pending_timer: Mutex::new(None),
            gate,
            sound,
            sounds_enabled: settings.sounds_enabled,
            sound_on_listening_start: settings.sound_on_listening_start.clone(),
            sound_on_listening_stop: settings.sound_on_listening_stop.clone(),
            double_tap_window: Duration::from_secs_f32(settings.double_tap_window),
            listening_state_delay: Duration::from_millis(settings.listening_state_delay_ms),
            events,
            runtime,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock().unwrap()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Feed one hotkey press (spec.md §4.7 steps 1-4). Must be cheap and
    /// non-blocking so it can be called directly from a global-hotkey
    /// callback thread.
    pub fn on_press(self: &Arc<Self>) {
        let now = Instant::now();
        let dt = {
            let mut last = self.last_tap_at.lock().unwrap();
            let dt = last.map(|t| now.duration_since(t));
            *last = Some(now);
            dt
        };

        if let Some(handle) = self.pending_timer.lock().unwrap().take() {
            handle.abort();
        }

        if let Some(dt) = dt
            && dt < self.double_tap_window
        {
            self.rotate_mode();
            return;
        }

        let this = Arc::clone(self);
        let window = self.double_tap_window;
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            this.toggle_armed();
        });
        *self.pending_timer.lock().unwrap() = Some(handle);
    }

    fn toggle_armed(&self) {
        if self.is_armed() {
            self.disarm();
        } else {
            self.arm();
        }
    }

    fn rotate_mode(&self) {
        if !self.is_armed() {
            self.arm();
        }
        let new_mode = {
            let mut mode = self.mode.lock().unwrap();
            *mode = mode.rotate();
            *mode
        };
        let _ = self.events.send(ControllerEvent::ModeChanged(new_mode));
    }

    /// Emit "listening-start", then flip the Preload/Resume Gate to
    /// RESUMED after `listening_state_delay_ms` so the beep itself doesn't
    /// seed a spurious utterance (spec.md §4.7).
    pub fn arm(&self) {
        if self.armed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.sounds_enabled {
            self.sound.play(&self.sound_on_listening_start);
        }
        let gate = self.gate.clone();
        let delay = self.listening_state_delay;
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            gate.resume();
        });
        let _ = self.events.send(ControllerEvent::Armed);
    }

    /// Pause the gate immediately (so no further audio is observed), emit
    /// "listening-stop", and publish `Disarmed` so subscribers cancel
    /// in-flight utterances, clear buffers, and flush preview state
    /// (spec.md §4.7).
    pub fn disarm(&self) {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return;
        }
        self.gate.pause();
        if self.sounds_enabled {
            self.sound.play(&self.sound_on_listening_stop);
        }
        let _ = self.events.send(ControllerEvent::Disarmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::NoopSound;

    fn controller(double_tap_window: f32) -> Arc<HotkeyController> {
        let settings = HotkeySettings {
            double_tap_window,
            listening_state_delay_ms: 5,
            ..HotkeySettings::default()
        };
        Arc::new(HotkeyController::new(
            &settings,
            Arc::new(PreloadResumeGate::new()),
            Arc::new(NoopSound),
            tokio::runtime::Handle::current(),
        ))
    }

    // Testable Property 7, first half: two presses within the window
    // produce exactly one mode rotation and zero arm-toggles.
    #[tokio::test(flavor = "multi_thread")]
    async fn double_tap_rotates_mode_without_arm_toggle() {
        let controller = controller(0.5);
        let mut events = controller.subscribe();

        controller.on_press();
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.on_press();

        // Let any stray timers resolve.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut rotations = 0;
        let mut armed_events = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                ControllerEvent::ModeChanged(_) => rotations += 1,
                ControllerEvent::Armed => armed_events += 1,
                ControllerEvent::Disarmed => {}
            }
        }
        assert_eq!(rotations, 1);
        // Rotating into Agent while disarmed arms the system, so exactly
        // one Armed event is expected here (arm(), not a toggle timer).
        assert_eq!(armed_events, 1);
        assert_eq!(controller.mode(), Mode::Agent);
    }

    // Testable Property 7, second half: two presses further apart than the
    // window each become an independent single-tap toggle.
    #[tokio::test(flavor = "multi_thread")]
    async fn slow_taps_each_toggle_armed() {
        let controller = controller(0.05);
        let mut events = events_after_first_tap(&controller).await;

        controller.on_press();
        tokio::time::sleep(Duration::from_millis(120)).await;
        controller.on_press();
        tokio::time::sleep(Duration::from_millis(120)).await;

        let mut toggles = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, ControllerEvent::Armed | ControllerEvent::Disarmed) {
                toggles += 1;
            }
        }
        assert_eq!(toggles, 2);
    }

    async fn events_after_first_tap(
        controller: &Arc<HotkeyController>,
    ) -> broadcast::Receiver<ControllerEvent> {
        controller.subscribe()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disarm_pauses_gate_immediately() {
        let controller = controller(0.5);
        controller.arm();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(controller.is_armed());

        controller.disarm();
        assert!(!controller.is_armed());
    }

    #[test]
    fn mode_rotate_is_an_involution() {
        assert_eq!(Mode::Listen.rotate().rotate(), Mode::Listen);
    }
}
