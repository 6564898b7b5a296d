//! Change notifications broadcast by the runtime.

use crate::{
    op::{Applied, Change},
    types::{BookId, Ticket},
};

/// Events emitted from the single-writer runtime loop.
///
/// Subscribers re-derive their view from a fresh snapshot; events only say
/// what changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A book was added.
    Added {
        /// Added id.
        id: BookId,
        /// Position in the catalog.
        index: usize,
    },
    /// Book fields changed, including optimistic and reverting changes.
    Updated {
        /// Updated id.
        id: BookId,
    },
    /// A book left the catalog.
    Removed {
        /// Removed id.
        id: BookId,
        /// Position it occupied.
        index: usize,
    },
    /// A removed book was put back after its delete failed.
    Reinstated {
        /// Reinstated id.
        id: BookId,
        /// Position it was put back at.
        index: usize,
    },
    /// A server request for this book is outstanding.
    InFlight {
        /// Book id.
        id: BookId,
        /// Mutation ticket.
        ticket: Ticket,
    },
    /// The outstanding request finished; `committed` is false on rollback.
    Settled {
        /// Book id.
        id: BookId,
        /// Mutation ticket.
        ticket: Ticket,
        /// Whether the optimistic value was kept.
        committed: bool,
    },
}

impl CatalogEvent {
    /// True for events that reflect a change to catalog contents.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::Updated { .. } | Self::Removed { .. } | Self::Reinstated { .. }
        )
    }

    pub(crate) fn from_change(change: &Change) -> Self {
        match &change.applied {
            Applied::Inserted { id, index } => Self::Added {
                id: id.clone(),
                index: *index,
            },
            Applied::Patched { id } => Self::Updated { id: id.clone() },
            Applied::Removed { id, index } => Self::Removed {
                id: id.clone(),
                index: *index,
            },
        }
    }

    pub(crate) fn from_revert(change: &Change) -> Self {
        match &change.applied {
            Applied::Inserted { id, index } => Self::Reinstated {
                id: id.clone(),
                index: *index,
            },
            _ => Self::from_change(change),
        }
    }
}
