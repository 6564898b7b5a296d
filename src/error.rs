//! Errors surfaced by the catalog runtime.

use thiserror::Error;

use crate::{
    book::ValidationError, core::store::StoreError, gateway::GatewayError, types::BookId,
};

/// Failure of one catalog operation. Never fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Missing or duplicate id.
    #[error(transparent)]
    Store(StoreError),
    /// Blank title or author; nothing was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Backend call failed outside an optimistic mutation.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Another server-backed mutation on this book has not settled yet.
    #[error("a change to book {0} is still in flight")]
    MutationPending(BookId),
    /// The runtime task is gone.
    #[error("catalog runtime is not running")]
    ChannelClosed,
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Invalid(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}
