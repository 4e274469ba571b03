//! Unified error types for voicekey-core.
//!
//! # Error Hierarchy
//!
//! ```text
//! VoiceKeyError
//!   ├── Audio(AudioError)   - device open/read errors
//!   ├── Vad(String)         - VAD stage errors
//!   ├── Config(String)      - settings load/validate errors
//!   ├── Keystroke(String)   - key-injection errors
//!   ├── Hotkey(String)      - chord registration errors
//!   └── Io(std::io::Error)  - generic I/O errors
//! ```
//!
//! # Migration Strategy
//!
//! Two error systems coexist deliberately, not by oversight:
//! typed `VoiceKeyError` at API boundaries a caller might match on, and
//! `anyhow::Result` inside component internals that only need to
//! propagate-and-log. Conversions are provided via `From` so call sites can
//! mix both with `?`.

/// Errors arising from the audio capture layer (C2).
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open audio stream: {0}")]
    StreamOpenFailed(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Top-level error type for voicekey-core operations.
#[derive(Debug, thiserror::Error)]
pub enum VoiceKeyError {
    /// Audio device open/read errors. Fatal at startup; logged and the
    /// frame dropped at runtime (spec.md §7).
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    /// VAD stage errors.
    #[error("vad error: {0}")]
    Vad(String),

    /// Settings load/parse/validate errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Keystroke injection errors.
    #[error("keystroke error: {0}")]
    Keystroke(String),

    /// Hotkey registration errors.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// Generic I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors bridged in from anyhow.
    #[error("{0}")]
    Other(String),
}

impl VoiceKeyError {
    pub fn vad(msg: impl Into<String>) -> Self {
        Self::Vad(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn keystroke(msg: impl Into<String>) -> Self {
        Self::Keystroke(msg.into())
    }

    pub fn hotkey(msg: impl Into<String>) -> Self {
        Self::Hotkey(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convenience result type using VoiceKeyError.
pub type Result<T> = std::result::Result<T, VoiceKeyError>;

impl From<anyhow::Error> for VoiceKeyError {
    fn from(err: anyhow::Error) -> Self {
        VoiceKeyError::Other(err.to_string())
    }
}
