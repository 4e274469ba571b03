//! `enigo`-backed `KeyInjector` (spec.md §6), grounded in the teacher's
//! `whis-core/src/typing.rs` enigo backend — adapted from whole-string
//! `.text()` calls to explicit `key(key, Direction::Press/Release)` so C5's
//! press-hold-release and chord-ordering contracts hold (spec.md §4.5).

use enigo::{Direction, Enigo, Key as EnigoKey, Keyboard, Settings};

use super::{Key, KeyInjector};

pub struct EnigoInjector {
    enigo: Enigo,
}

impl EnigoInjector {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|err| anyhow::anyhow!("failed to initialize enigo: {err}"))?;
        Ok(Self { enigo })
    }
}

fn to_enigo_key(key: Key) -> EnigoKey {
    match key {
        Key::Ctrl => EnigoKey::Control,
        Key::Shift => EnigoKey::Shift,
        Key::Alt => EnigoKey::Alt,
        Key::Super => EnigoKey::Meta,
        Key::Space => EnigoKey::Space,
        Key::Backspace => EnigoKey::Backspace,
        Key::Enter => EnigoKey::Return,
        Key::Tab => EnigoKey::Tab,
        Key::Escape => EnigoKey::Escape,
        Key::Delete => EnigoKey::Delete,
        Key::Char(c) => EnigoKey::Unicode(c),
    }
}

impl KeyInjector for EnigoInjector {
    fn press(&mut self, key: Key) -> anyhow::Result<()> {
        self.enigo
            .key(to_enigo_key(key), Direction::Press)
            .map_err(|err| anyhow::anyhow!("press failed: {err}"))
    }

    fn release(&mut self, key: Key) -> anyhow::Result<()> {
        self.enigo
            .key(to_enigo_key(key), Direction::Release)
            .map_err(|err| anyhow::anyhow!("release failed: {err}"))
    }
}
