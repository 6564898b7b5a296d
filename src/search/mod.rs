//! Debounced incremental search pipeline.

/// Sequence-ordered search requests and the rendered result state.
pub mod client;
/// Keystroke debouncer.
pub mod debounce;
/// Debouncer wired to the search client.
pub mod live;
/// Query, hit, and result-set types.
pub mod query;
