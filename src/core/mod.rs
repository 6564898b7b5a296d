//! In-memory authoritative catalog and its filter view.

/// Lazy, restartable filter over the catalog.
pub mod filter;
/// Authoritative book collection.
pub mod store;
