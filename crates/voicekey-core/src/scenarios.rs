//! End-to-end scenarios (spec.md §8 S1-S6), assembled from C1-C8 against
//! fake STT/VAD/keystroke backends. Each component's own properties are
//! tested in its own module; this module checks they compose correctly,
//! the way `service::run`'s event loop wires them together, without the
//! real audio/hotkey/subprocess I/O that function depends on.
