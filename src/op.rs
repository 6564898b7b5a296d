//! Reversible catalog mutation ops.

use crate::{
    book::{Book, BookPatch},
    types::{BookId, ChangeSeq},
};

/// One catalog mutation. Every op applied to the store yields its inverse,
/// which is what optimistic rollback replays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Insert a fully materialized book.
    Insert {
        /// Inserted record.
        book: Book,
        /// Position to insert at; `None` appends. Clamped to the catalog length.
        at: Option<usize>,
    },
    /// Patch a record, including the precomputed inverse patch.
    Patch {
        /// Book to mutate.
        id: BookId,
        /// Forward patch.
        patch: BookPatch,
        /// Inverse patch that restores prior state.
        prev: BookPatch,
    },
    /// Remove a record.
    Remove {
        /// Book to remove.
        id: BookId,
    },
    /// Hide a record but keep its slot in the catalog order.
    Detach {
        /// Book to hide.
        id: BookId,
    },
    /// Put a detached record back into its slot.
    Reattach {
        /// Book to restore.
        id: BookId,
    },
}

impl Op {
    /// Id of the book this op touches.
    pub fn target(&self) -> &BookId {
        match self {
            Op::Insert { book, .. } => &book.id,
            Op::Patch { id, .. }
            | Op::Remove { id }
            | Op::Detach { id }
            | Op::Reattach { id } => id,
        }
    }
}

/// What actually happened when an [`Op`] was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Book appended or inserted at `index`.
    Inserted {
        /// Inserted id.
        id: BookId,
        /// Final position.
        index: usize,
    },
    /// Book fields changed.
    Patched {
        /// Patched id.
        id: BookId,
    },
    /// Book removed from `index`.
    Removed {
        /// Removed id.
        id: BookId,
        /// Position it occupied.
        index: usize,
    },
}

/// Change record emitted by the store for every committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Monotonic change sequence.
    pub seq: ChangeSeq,
    /// Effect of the mutation.
    pub applied: Applied,
}
