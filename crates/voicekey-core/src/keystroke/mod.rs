//! Keystroke Engine (C5).
//!
//! Single consumer of `Task`s, one dedicated thread (T_type in spec.md §5).
//! All character output passes through here so preview and final text can
//! never interleave at the character level (spec.md §4.5, §9).

pub mod enigo_backend;
pub mod substitution;

use std::thread;
use std::time::Duration;

use crate::settings::Action;

/// A virtual key the injector can press/release (spec.md §6's keystroke
/// injection interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Ctrl,
    Shift,
    Alt,
    Super,
    Space,
    Backspace,
    Enter,
    Tab,
    Escape,
    Delete,
    Char(char),
}

/// `press(key)`, `release(key)` (spec.md §6). Implementations run on the
/// same thread as the `KeystrokeEngine` that owns them — no internal
/// synchronization required.
pub trait KeyInjector: Send {
    fn press(&mut self, key: Key) -> anyhow::Result<()>;
    fn release(&mut self, key: Key) -> anyhow::Result<()>;
}

/// One item on the output queue (spec.md §4.5). Producers enqueue these;
/// only the engine's worker thread ever touches the injector.
#[derive(Debug, Clone)]
pub enum Task {
    TypeFinal(String),
    TypePreview(String),
    Backspace(usize),
    /// Retract any un-committed preview without typing anything new
    /// (spec.md §4.7: disarm must flush preview state immediately).
    FlushPreview,
}

/// Parse a chord string like "ctrl+alt+z" into an ordered key sequence.
/// Order matters: chords press in listed order and release in reverse
/// (spec.md §4.5 chord press policy).
fn parse_chord(chord: &str) -> Vec<Key> {
    chord
        .split('+')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .map(|part| match part.as_str() {
            "ctrl" | "control" => Key::Ctrl,
            "shift" => Key::Shift,
            "alt" | "option" => Key::Alt,
            "super" | "meta" | "win" | "cmd" => Key::Super,
            "space" => Key::Space,
            "enter" | "return" => Key::Enter,
            "tab" => Key::Tab,
            "escape" | "esc" => Key::Escape,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            other => Key::Char(other.chars().next().unwrap_or(' ')),
        })
        .collect()
}

/// Tracks what's currently shown on screen from an un-committed preview, so
/// a later final (or a disarm) knows how much to backspace (spec.md §3).
#[derive(Default)]
struct PreviewState {
    length_typed: usize,
}

/// The Keystroke Engine (C5). Generic over the injector so tests can swap
/// in a logging fake instead of driving real OS input.
pub struct KeystrokeEngine<I: KeyInjector> {
    injector: I,
    typing_delay: Duration,
    key_hold: Duration,
    word_mappings: Vec<(String, String)>,
    preview: PreviewState,
}

impl<I: KeyInjector> KeystrokeEngine<I> {
    pub fn new(
        injector: I,
        typing_delay_ms: u64,
        key_hold_ms: u64,
        word_mappings: Vec<(String, String)>,
    ) -> Self {
        Self {
            injector,
            typing_delay: Duration::from_millis(typing_delay_ms),
            key_hold: Duration::from_millis(key_hold_ms),
            word_mappings,
            preview: PreviewState::default(),
        }
    }

    /// Drain tasks from `tasks` until the channel closes. Intended to run
    /// on its own dedicated thread (T_type).
    pub fn run(mut self, tasks: crossbeam_channel::Receiver<Task>) {
        while let Ok(task) = tasks.recv() {
            self.handle(task);
        }
    }

    pub fn handle(&mut self, task: Task) {
        match task {
            Task::TypeFinal(text) => self.type_final(&text),
            Task::TypePreview(text) => self.type_preview(&text),
            Task::Backspace(n) => {
                self.backspace(n);
                self.preview.length_typed = self.preview.length_typed.saturating_sub(n);
            }
            Task::FlushPreview => self.retract_preview(),
        }
    }

    /// Retract any un-committed preview, apply word substitutions, press
    /// the result, and append a single trailing space (spec.md §4.5).
    /// Callers must not invoke this for empty/discarded text — an empty
    /// final elides typing (and the trailing space) entirely.
    fn type_final(&mut self, text: &str) {
        self.retract_preview();
        let items = substitution::apply_word_map(text, &self.word_mappings);
        for item in items {
            match item {
                Action::Literal(chunk) => self.type_chars(&chunk),
                Action::Hotkey(chord) => self.press_chord(&chord),
            }
        }
        self.press_release(Key::Space);
    }

    /// Backspace any prior preview, type the new text raw (no
    /// substitutions), and remember its length for the next retraction.
    fn type_preview(&mut self, text: &str) {
        self.retract_preview();
        self.type_chars(text);
        self.preview.length_typed = text.chars().count();
    }

    /// Used directly by disarm handling (spec.md §4.7: mode rotation into
    /// Agent must flush any residual preview first).
    pub fn retract_preview(&mut self) {
        if self.preview.length_typed > 0 {
            self.backspace(self.preview.length_typed);
            self.preview.length_typed = 0;
        }
    }

    fn backspace(&mut self, n: usize) {
        for _ in 0..n {
            self.press_release(Key::Backspace);
        }
    }

    fn type_chars(&mut self, text: &str) {
        for c in text.chars() {
            let key = if c == ' ' { Key::Space } else { Key::Char(c) };
            self.press_release(key);
            if !self.typing_delay.is_zero() {
                thread::sleep(self.typing_delay);
            }
        }
    }

    /// Press modifiers and the final key in listed order with an
    /// inter-press hold, release in reverse order.
    fn press_chord(&mut self, chord: &str) {
        let keys = parse_chord(chord);
        for (idx, key) in keys.iter().enumerate() {
            if let Err(err) = self.injector.press(*key) {
                crate::warn!("chord press failed for {chord}: {err}");
            }
            if idx + 1 < keys.len() && !self.key_hold.is_zero() {
                thread::sleep(self.key_hold);
            }
        }
        for key in keys.iter().rev() {
            if let Err(err) = self.injector.release(*key) {
                crate::warn!("chord release failed for {chord}: {err}");
            }
        }
    }

    /// Explicit press-hold-release for a single key (spec.md §4.5: never
    /// rely on auto-repeat, some hosts require a minimum key-down
    /// interval). Errors are logged and the character is skipped; the
    /// queue continues (spec.md §7).
    fn press_release(&mut self, key: Key) {
        if let Err(err) = self.injector.press(key) {
            crate::warn!("keystroke press failed: {err}");
            return;
        }
        if !self.key_hold.is_zero() {
            thread::sleep(self.key_hold);
        }
        if let Err(err) = self.injector.release(key) {
            crate::warn!("keystroke release failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LoggingInjector {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl LoggingInjector {
        fn events(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl KeyInjector for LoggingInjector {
        fn press(&mut self, key: Key) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("press:{key:?}"));
            Ok(())
        }
        fn release(&mut self, key: Key) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("release:{key:?}"));
            Ok(())
        }
    }

    fn engine(mappings: Vec<(String, String)>) -> (KeystrokeEngine<LoggingInjector>, LoggingInjector) {
        let injector = LoggingInjector::default();
        let engine = KeystrokeEngine::new(injector.clone(), 0, 0, mappings);
        (engine, injector)
    }

    fn chars_of(log: &[String]) -> String {
        log.iter()
            .filter_map(|e| e.strip_prefix("press:Char('"))
            .filter_map(|e| e.strip_suffix("')"))
            .map(|c| c.chars().next().unwrap())
            .collect()
    }

    /// Replay the `press` half of the log against a virtual screen: chars
    /// and spaces append, Backspace pops. Models "what's on screen" so
    /// retraction-then-retype sequences can be asserted on net effect
    /// rather than on the raw (append-only) event log.
    fn simulate_screen(log: &[String]) -> String {
        let mut screen = String::new();
        for event in log {
            let Some(rest) = event.strip_prefix("press:") else {
                continue;
            };
            if rest == "Backspace" {
                screen.pop();
            } else if rest == "Space" {
                screen.push(' ');
            } else if let Some(c) = rest.strip_prefix("Char('").and_then(|s| s.strip_suffix("')"))
            {
                screen.push_str(c);
            }
        }
        screen
    }

    // Testable Property 4: net characters equal apply_word_map(X) + " "
    // regardless of preceding TypePreview calls.
    #[test]
    fn preview_is_fully_retracted_before_final() {
        let (mut engine, injector) = engine(vec![]);
        engine.handle(Task::TypePreview("hel".to_string()));
        engine.handle(Task::TypePreview("hello".to_string()));
        engine.handle(Task::TypeFinal("hello world".to_string()));

        let log = injector.events();
        let presses = log.iter().filter(|e| e.starts_with("press:")).count();
        let releases = log.iter().filter(|e| e.starts_with("release:")).count();
        assert_eq!(presses, releases);

        assert_eq!(simulate_screen(&log), "hello world ");
    }

    #[test]
    fn type_final_appends_trailing_space_as_space_key() {
        let (mut engine, injector) = engine(vec![]);
        engine.handle(Task::TypeFinal("hi".to_string()));
        let log = injector.events();
        assert_eq!(log.last().unwrap(), "release:Space");
        assert!(log.iter().any(|e| e == "press:Space"));
    }

    // S3: comma mapping attaches to the previous word with no intervening
    // space keystroke.
    #[test]
    fn comma_substitution_skips_the_separating_space() {
        let (mut engine, injector) = engine(vec![("comma".to_string(), ",".to_string())]);
        engine.handle(Task::TypeFinal("hello comma world".to_string()));
        assert_eq!(chars_of(&injector.events()), "hello,world");
    }

    // S4: chord press/release ordering is listed-order press, reverse-order
    // release.
    #[test]
    fn chord_presses_in_order_and_releases_in_reverse() {
        let (mut engine, injector) = engine(vec![("now undo".to_string(), "ctrl+z".to_string())]);
        engine.handle(Task::TypeFinal("fix this now undo".to_string()));
        let log = injector.events();

        let ctrl_press = log.iter().position(|e| e == "press:Ctrl").unwrap();
        let z_press = log.iter().position(|e| e == "press:Char('z')").unwrap();
        let z_release = log.iter().position(|e| e == "release:Char('z')").unwrap();
        let ctrl_release = log.iter().position(|e| e == "release:Ctrl").unwrap();

        assert!(ctrl_press < z_press);
        assert!(z_release < ctrl_release);
    }

    // Testable Property 9: order preservation for an arbitrary task
    // sequence (no reordering of TypeFinal vs Backspace vs TypePreview).
    #[test]
    fn tasks_execute_in_enqueue_order() {
        let (mut engine, injector) = engine(vec![]);
        engine.handle(Task::TypeFinal("a".to_string()));
        engine.handle(Task::Backspace(1));
        engine.handle(Task::TypeFinal("b".to_string()));

        // "a " typed, trailing space backspaced away, then "b " typed: had
        // the tasks reordered, the screen would not read "ab ".
        assert_eq!(simulate_screen(&injector.events()), "ab ");
    }
}
