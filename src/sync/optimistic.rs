use std::{future::Future, time::Duration};

use hashbrown::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    core::store::CatalogStore,
    error::CatalogError,
    gateway::{GatewayError, GatewayResult, with_timeout},
    op::{Change, Op},
    types::{BookId, Ticket},
};

/// Server-backed aspect of a book a mutation changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationField {
    /// The `available` flag.
    Availability,
    /// Whether the book is in the catalog at all.
    Presence,
}

/// Value of a [`MutationField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Availability flag.
    Available(bool),
    /// Catalog membership.
    Present(bool),
}

/// Lifecycle of one optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Applied locally, request outstanding.
    Pending,
    /// Server accepted; local value stands.
    Committed,
    /// Server refused or never answered; local value reverted.
    RolledBack,
}

/// Record of an optimistic mutation from initiation to reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Ticket issued when the mutation started.
    pub ticket: Ticket,
    /// Book the mutation targets.
    pub target_id: BookId,
    /// Field being changed.
    pub field: MutationField,
    /// Value before the mutation.
    pub previous_value: FieldValue,
    /// Value the user asked for.
    pub desired_value: FieldValue,
    /// Current status.
    pub status: MutationStatus,
}

/// Field, old value, and new value of a mutation about to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    /// Field being changed.
    pub field: MutationField,
    /// Value before.
    pub previous_value: FieldValue,
    /// Value after.
    pub desired_value: FieldValue,
}

impl Intent {
    /// Flip of the availability flag.
    pub fn availability(previous: bool) -> Self {
        Self {
            field: MutationField::Availability,
            previous_value: FieldValue::Available(previous),
            desired_value: FieldValue::Available(!previous),
        }
    }

    /// Removal from the catalog.
    pub fn removal() -> Self {
        Self {
            field: MutationField::Presence,
            previous_value: FieldValue::Present(true),
            desired_value: FieldValue::Present(false),
        }
    }
}

/// Result of a request, addressed back to the ledger.
#[derive(Debug)]
pub struct Settlement {
    /// Mutation the request belongs to.
    pub ticket: Ticket,
    /// Its target.
    pub target_id: BookId,
    /// What the server said.
    pub outcome: GatewayResult<()>,
}

/// Terminal outcome reported to whoever initiated the mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// Optimistic value kept.
    Committed,
    /// Optimistic value undone because of the error.
    RolledBack(GatewayError),
}

/// Everything the runtime needs to report after a settlement.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The mutation in its terminal status.
    pub mutation: PendingMutation,
    /// Store change caused by the revert, if one was applied.
    pub revert: Option<Change>,
    /// Caller-facing outcome.
    pub outcome: Reconciled,
}

struct InFlight {
    mutation: PendingMutation,
    revert: Op,
}

/// One pending slot per book; requests report back over an mpsc channel so
/// reconciliation runs on the same task that owns the store.
pub struct OptimisticSync {
    in_flight: HashMap<BookId, InFlight>,
    next_ticket: Ticket,
    settle_tx: mpsc::UnboundedSender<Settlement>,
    timeout: Duration,
}

impl OptimisticSync {
    pub fn new(settle_tx: mpsc::UnboundedSender<Settlement>, timeout: Duration) -> Self {
        Self {
            in_flight: HashMap::new(),
            next_ticket: 1,
            settle_tx,
            timeout,
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn pending(&self, id: &str) -> Option<&PendingMutation> {
        self.in_flight.get(id).map(|f| &f.mutation)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Applies `apply` to the store now, then sends `request` off.
    ///
    /// The store computes the revert op. The request runs under the
    /// configured timeout on its own task and its result comes back as a
    /// [`Settlement`] to be passed to [`OptimisticSync::settle`].
    pub fn with_optimistic_mutation<R>(
        &mut self,
        store: &mut CatalogStore,
        apply: Op,
        intent: Intent,
        request: R,
    ) -> Result<(Ticket, Change), CatalogError>
    where
        R: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let target_id = apply.target().clone();
        if self.is_pending(&target_id) {
            return Err(CatalogError::MutationPending(target_id));
        }

        let (change, revert) = store.apply(apply)?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight.insert(
            target_id.clone(),
            InFlight {
                mutation: PendingMutation {
                    ticket,
                    target_id: target_id.clone(),
                    field: intent.field,
                    previous_value: intent.previous_value,
                    desired_value: intent.desired_value,
                    status: MutationStatus::Pending,
                },
                revert,
            },
        );
        debug!(book_id = %target_id, ticket, field = ?intent.field, "optimistic mutation applied");

        let settle_tx = self.settle_tx.clone();
        let limit = self.timeout;
        tokio::spawn(async move {
            let outcome = with_timeout(limit, request).await;
            let _ = settle_tx.send(Settlement {
                ticket,
                target_id,
                outcome,
            });
        });

        Ok((ticket, change))
    }

    /// Commits or rolls back the mutation `settlement` answers.
    ///
    /// Returns `None` for settlements that match no pending mutation.
    pub fn settle(&mut self, store: &mut CatalogStore, settlement: Settlement) -> Option<Reconciliation> {
        let Settlement {
            ticket,
            target_id,
            outcome,
        } = settlement;

        if self.in_flight.get(&target_id)?.mutation.ticket != ticket {
            warn!(book_id = %target_id, ticket, "settlement for unknown ticket ignored");
            return None;
        }
        let InFlight {
            mut mutation,
            revert,
        } = self.in_flight.remove(&target_id)?;

        match outcome {
            Ok(()) => {
                mutation.status = MutationStatus::Committed;
                if let Op::Reattach { id } = &revert {
                    store.purge_detached(id);
                }
                info!(book_id = %target_id, ticket, "mutation committed");
                Some(Reconciliation {
                    mutation,
                    revert: None,
                    outcome: Reconciled::Committed,
                })
            }
            Err(err) => {
                mutation.status = MutationStatus::RolledBack;
                let revert = match store.apply(revert) {
                    Ok((change, _)) => Some(change),
                    Err(store_err) => {
                        warn!(book_id = %target_id, ticket, error = %store_err, "revert could not be applied");
                        None
                    }
                };
                warn!(book_id = %target_id, ticket, error = %err, "mutation rolled back");
                Some(Reconciliation {
                    mutation,
                    revert,
                    outcome: Reconciled::RolledBack(err),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookPatch;

    fn toggle_op(id: &str, available: bool) -> Op {
        Op::Patch {
            id: id.to_string(),
            patch: BookPatch::availability(available),
            prev: BookPatch::default(),
        }
    }

    #[tokio::test]
    async fn failed_request_reverts_and_frees_slot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = OptimisticSync::new(tx, Duration::from_secs(1));
        let mut store = CatalogStore::with_sample_books();

        let (ticket, _) = sync
            .with_optimistic_mutation(
                &mut store,
                toggle_op("1", false),
                Intent::availability(true),
                async { Err(GatewayError::Rejected { status: Some(500) }) },
            )
            .unwrap();
        assert!(!store.get("1").unwrap().available);

        let second = sync.with_optimistic_mutation(
            &mut store,
            toggle_op("1", true),
            Intent::availability(false),
            async { Ok(()) },
        );
        assert_eq!(second, Err(CatalogError::MutationPending("1".to_string())));

        let settlement = rx.recv().await.unwrap();
        assert_eq!(settlement.ticket, ticket);
        let rec = sync.settle(&mut store, settlement).unwrap();

        assert_eq!(rec.mutation.status, MutationStatus::RolledBack);
        assert!(rec.revert.is_some());
        assert!(store.get("1").unwrap().available);
        assert!(!sync.is_pending("1"));
    }

    #[tokio::test]
    async fn stale_ticket_is_ignored() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut sync = OptimisticSync::new(tx, Duration::from_secs(1));
        let mut store = CatalogStore::with_sample_books();

        sync.with_optimistic_mutation(
            &mut store,
            toggle_op("2", false),
            Intent::availability(true),
            std::future::pending(),
        )
        .unwrap();

        let bogus = Settlement {
            ticket: 99,
            target_id: "2".to_string(),
            outcome: Ok(()),
        };
        assert!(sync.settle(&mut store, bogus).is_none());
        assert!(sync.is_pending("2"));
    }

    #[tokio::test]
    async fn committed_delete_releases_its_slot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sync = OptimisticSync::new(tx, Duration::from_secs(1));
        let mut store = CatalogStore::with_sample_books();

        sync.with_optimistic_mutation(
            &mut store,
            Op::Detach { id: "2".to_string() },
            Intent::removal(),
            async { Ok(()) },
        )
        .unwrap();
        assert!(store.is_detached("2"));

        let settlement = rx.recv().await.unwrap();
        let rec = sync.settle(&mut store, settlement).unwrap();

        assert_eq!(rec.outcome, Reconciled::Committed);
        assert!(!store.is_detached("2"));
        assert_eq!(store.ordered_ids(), ["1", "3"]);
    }
}
