//! Client-side catalog state and synchronization for a library browser.
//!
//! The crate owns the in-memory book collection, applies server-backed
//! mutations optimistically (rolling them back when the server refuses), and
//! runs the debounced incremental search.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::CatalogStore`]:
//! ```
//! use shelfsync::{
//!     book::BookDraft,
//!     core::{filter::CatalogFilter, store::CatalogStore},
//!     types::Genre,
//! };
//!
//! let mut store = CatalogStore::with_sample_books();
//! let (id, _change) = store
//!     .add(BookDraft::new("Emma", "Jane Austen", Genre::Romance))
//!     .expect("add");
//! assert_eq!(id, "4");
//!
//! let titles: Vec<_> = store
//!     .filter(&CatalogFilter::term("GATSBY"))
//!     .map(|b| b.title.as_str())
//!     .collect();
//! assert_eq!(titles, ["The Great Gatsby"]);
//! ```
//!
//! Runtime usage against the static-mode gateway:
//! ```
//! use std::sync::Arc;
//!
//! use shelfsync::{
//!     core::store::CatalogStore,
//!     gateway::local::LocalGateway,
//!     runtime::handle::{spawn_catalog, Collaborators, RuntimeConfig},
//!     sync::optimistic::Reconciled,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let gateway = Arc::new(LocalGateway::in_memory().expect("storage"));
//! let handle = spawn_catalog(
//!     CatalogStore::with_sample_books(),
//!     gateway,
//!     Collaborators::headless(),
//!     RuntimeConfig::default(),
//! );
//! let outcome = handle.toggle_availability("1").await.expect("toggle");
//! assert_eq!(outcome, Reconciled::Committed);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Book record, draft, patch, and form types.
pub mod book;
/// TOML configuration.
pub mod config;
/// Catalog store and filter.
pub mod core;
/// Runtime error type.
pub mod error;
/// Backend boundary.
pub mod gateway;
/// Tracing setup.
pub mod observability;
/// Reversible mutation ops.
pub mod op;
/// Local persisted storage.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Debounced search pipeline.
pub mod search;
/// Optimistic mutation primitive and collaborators.
pub mod sync;
/// Shared primitive types and enums.
pub mod types;
