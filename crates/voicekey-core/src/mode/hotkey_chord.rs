//! Chord parsing and matching, grounded in `whis-core/src/hotkey.rs`.
//!
//! Adapted from the teacher's `Hotkey` type: same modifier-alias grammar and
//! left/right-variant matching, `Option` instead of a typed parse error since
//! the controller only ever needs "did it parse" at config-validation time.

use rdev::Key;
use std::collections::HashSet;

/// A parsed global chord: modifiers plus one main key.
#[derive(Debug, Clone)]
pub struct Hotkey {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub super_key: bool,
    pub key: Key,
}

impl Hotkey {
    /// Parse a chord string like "ctrl+alt+w". Supported modifier aliases:
    /// ctrl/control, shift, alt/option, super/meta/win/cmd.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        let parts: Vec<&str> = lower.split('+').map(|p| p.trim()).collect();
        if parts.is_empty() || parts.iter().all(|p| p.is_empty()) {
            return None;
        }

        let mut ctrl = false;
        let mut shift = false;
        let mut alt = false;
        let mut super_key = false;
        let mut main_key: Option<Key> = None;

        for part in parts {
            match part {
                "ctrl" | "control" => ctrl = true,
                "shift" => shift = true,
                "alt" | "option" => alt = true,
                "super" | "meta" | "win" | "cmd" => super_key = true,
                "" => {}
                key_str => main_key = Some(parse_key(key_str)?),
            }
        }

        Some(Hotkey {
            ctrl,
            shift,
            alt,
            super_key,
            key: main_key?,
        })
    }

    /// Whether every required modifier and the main key are currently
    /// pressed. Handles left/right variants of modifier keys.
    pub fn is_pressed(&self, pressed: &HashSet<Key>) -> bool {
        let ctrl_ok = !self.ctrl
            || pressed.contains(&Key::ControlLeft)
            || pressed.contains(&Key::ControlRight);
        let shift_ok =
            !self.shift || pressed.contains(&Key::ShiftLeft) || pressed.contains(&Key::ShiftRight);
        let alt_ok = !self.alt || pressed.contains(&Key::Alt);
        let super_ok = !self.super_key
            || pressed.contains(&Key::MetaLeft)
            || pressed.contains(&Key::MetaRight);
        let key_ok = pressed.contains(&self.key);

        ctrl_ok && shift_ok && alt_ok && super_ok && key_ok
    }
}

fn parse_key(s: &str) -> Option<Key> {
    let s = if s.starts_with("key") && s.len() == 4 {
        &s[3..]
    } else {
        s
    };

    Some(match s {
        "a" => Key::KeyA,
        "b" => Key::KeyB,
        "c" => Key::KeyC,
        "d" => Key::KeyD,
        "e" => Key::KeyE,
        "f" => Key::KeyF,
        "g" => Key::KeyG,
        "h" => Key::KeyH,
        "i" => Key::KeyI,
        "j" => Key::KeyJ,
        "k" => Key::KeyK,
        "l" => Key::KeyL,
        "m" => Key::KeyM,
        "n" => Key::KeyN,
        "o" => Key::KeyO,
        "p" => Key::KeyP,
        "q" => Key::KeyQ,
        "r" => Key::KeyR,
        "s" => Key::KeyS,
        "t" => Key::KeyT,
        "u" => Key::KeyU,
        "v" => Key::KeyV,
        "w" => Key::KeyW,
        "x" => Key::KeyX,
        "y" => Key::KeyY,
        "z" => Key::KeyZ,
        "0" => Key::Num0,
        "1" => Key::Num1,
        "2" => Key::Num2,
        "3" => Key::Num3,
        "4" => Key::Num4,
        "5" => Key::Num5,
        "6" => Key::Num6,
        "7" => Key::Num7,
        "8" => Key::Num8,
        "9" => Key::Num9,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "escape" | "esc" => Key::Escape,
        "tab" => Key::Tab,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_chord() {
        let hotkey = Hotkey::parse("ctrl+alt+w").unwrap();
        assert!(hotkey.ctrl);
        assert!(hotkey.alt);
        assert!(!hotkey.shift);
        assert_eq!(hotkey.key, Key::KeyW);
    }

    #[test]
    fn parses_single_key_with_no_modifiers() {
        let hotkey = Hotkey::parse("f9").unwrap();
        assert!(!hotkey.ctrl && !hotkey.shift && !hotkey.alt && !hotkey.super_key);
        assert_eq!(hotkey.key, Key::F9);
    }

    #[test]
    fn rejects_empty_or_modifier_only() {
        assert!(Hotkey::parse("").is_none());
        assert!(Hotkey::parse("ctrl+shift").is_none());
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(Hotkey::parse("ctrl+whatever").is_none());
    }

    #[test]
    fn is_pressed_accepts_either_side_of_modifier() {
        let hotkey = Hotkey::parse("ctrl+w").unwrap();
        let pressed: HashSet<Key> = [Key::ControlRight, Key::KeyW].into_iter().collect();
        assert!(hotkey.is_pressed(&pressed));
    }
}
