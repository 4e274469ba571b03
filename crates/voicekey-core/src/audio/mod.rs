//! Audio capture and the pre-roll ring buffer (C2).

pub mod capture;
pub mod frame;

pub use capture::{AudioCapture, CapturedFrame};
pub use frame::{Frame, PreRoll};
