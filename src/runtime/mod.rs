//! Single-writer async runtime and change-notification stream.

/// Change notifications emitted by the runtime.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
