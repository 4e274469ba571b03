//! Global hotkey listener (T_hotkey in spec.md §5).
//!
//! Grounded in the teacher's `whis-cli/src/hotkey/unix_like.rs`:
//! `rdev::grab` on Linux (works under both X11 and Wayland), `rdev::listen`
//! on macOS, a pressed-key `HashSet` tracked across press/release events.
//! Adapted with edge detection: `on_press` fires once when the chord
//! transitions from not-fully-pressed to fully-pressed, not on every
//! matching `KeyPress` while the chord is held (key auto-repeat would
//! otherwise fire the Mode/Hotkey Controller repeatedly for one physical
//! press).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rdev::{Event, EventType, Key};

use super::HotkeyController;
use super::hotkey_chord::Hotkey;

/// Grab/listen for global keyboard events and call
/// `controller.on_press()` on each press-edge of `hotkey`. Blocks the
/// calling thread — spawn it on its own dedicated OS thread.
pub fn run(hotkey: Hotkey, controller: Arc<HotkeyController>) {
    let pressed: Arc<Mutex<HashSet<Key>>> = Arc::new(Mutex::new(HashSet::new()));
    let was_satisfied = Arc::new(AtomicBool::new(false));

    #[cfg(target_os = "linux")]
    {
        let callback = move |event: Event| -> Option<Event> {
            handle_event(&hotkey, &controller, &pressed, &was_satisfied, &event);
            Some(event)
        };
        if let Err(err) = rdev::grab(callback) {
            crate::error!(
                "failed to grab keyboard for hotkey listening: {err:?} (is the user in the `input` group and is uinput accessible?)"
            );
        }
    }

    #[cfg(target_os = "macos")]
    {
        let callback = move |event: Event| {
            handle_event(&hotkey, &controller, &pressed, &was_satisfied, &event);
        };
        if let Err(err) = rdev::listen(callback) {
            crate::error!(
                "failed to listen for keyboard events: {err:?} (has this app been granted Accessibility permission?)"
            );
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = (hotkey, controller, pressed, was_satisfied);
        crate::error!("global hotkey listening is not supported on this platform");
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn handle_event(
    hotkey: &Hotkey,
    controller: &Arc<HotkeyController>,
    pressed: &Arc<Mutex<HashSet<Key>>>,
    was_satisfied: &Arc<AtomicBool>,
    event: &Event,
) {
    match event.event_type {
        EventType::KeyPress(key) => {
            let satisfied = {
                let mut keys = pressed.lock().unwrap();
                keys.insert(key);
                hotkey.is_pressed(&keys)
            };
            if satisfied && !was_satisfied.swap(true, Ordering::SeqCst) {
                controller.on_press();
            }
        }
        EventType::KeyRelease(key) => {
            pressed.lock().unwrap().remove(&key);
            was_satisfied.store(false, Ordering::SeqCst);
        }
        _ => {}
    }
}
