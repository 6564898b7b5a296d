use std::{sync::Arc, time::Duration};

use hashbrown::HashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    book::{Book, BookDraft, BookForm, BookPatch},
    core::{
        filter::CatalogFilter,
        store::{CatalogStore, StoreError},
    },
    error::CatalogError,
    gateway::{CatalogGateway, GatewayError},
    op::{Change, Op},
    sync::{
        collab::{AutoConfirm, ConfirmGate, NoticeKind, Notifier, TracingNotifier},
        optimistic::{
            FieldValue, Intent, MutationField, OptimisticSync, PendingMutation, Reconciled,
            Reconciliation, Settlement,
        },
    },
    types::{BookId, Ticket},
};

use super::events::CatalogEvent;

/// Prompt passed to the [`ConfirmGate`] before a delete.
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this book?";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub request_timeout_ms: u64,
    pub command_queue: usize,
    pub event_queue: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            command_queue: 256,
            event_queue: 1024,
        }
    }
}

/// Presentation-side collaborators the runtime reports to.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub confirm: Arc<dyn ConfirmGate>,
}

impl Collaborators {
    /// Logs notices and confirms every delete.
    pub fn headless() -> Self {
        Self {
            notifier: Arc::new(TracingNotifier),
            confirm: Arc::new(AutoConfirm(true)),
        }
    }
}

/// Book as the list renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedBook {
    pub book: Book,
    /// A server request for this book has not settled yet.
    pub in_flight: bool,
}

/// How a delete request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user said no; nothing changed.
    Declined,
    /// Server confirmed the delete.
    Deleted,
    /// Delete failed; the book is back at its old position.
    Restored(GatewayError),
}

#[derive(Clone)]
pub struct CatalogHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<CatalogEvent>,
    confirm: Arc<dyn ConfirmGate>,
}

type Reply<T> = oneshot::Sender<Result<T, CatalogError>>;

enum Command {
    Add {
        draft: BookDraft,
        resp: Reply<BookId>,
    },
    Update {
        id: BookId,
        patch: BookPatch,
        resp: Reply<()>,
    },
    Remove {
        id: BookId,
        resp: Reply<Book>,
    },
    ToggleAvailability {
        id: BookId,
        resp: Reply<Reconciled>,
    },
    Delete {
        id: BookId,
        resp: Reply<Reconciled>,
    },
    Get {
        id: BookId,
        resp: oneshot::Sender<Option<Book>>,
    },
    List {
        filter: CatalogFilter,
        resp: oneshot::Sender<Vec<ListedBook>>,
    },
    Pending {
        id: BookId,
        resp: oneshot::Sender<Option<PendingMutation>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

pub fn spawn_catalog(
    store: CatalogStore,
    gateway: Arc<dyn CatalogGateway>,
    collaborators: Collaborators,
    config: RuntimeConfig,
) -> CatalogHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue);
    let (events_tx, _) = broadcast::channel::<CatalogEvent>(config.event_queue);
    let (settle_tx, mut settle_rx) = mpsc::unbounded_channel::<Settlement>();

    let mut worker = Worker {
        store,
        sync: OptimisticSync::new(settle_tx, Duration::from_millis(config.request_timeout_ms)),
        gateway,
        notifier: Arc::clone(&collaborators.notifier),
        events_tx: events_tx.clone(),
        waiters: HashMap::new(),
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if worker.handle_command(cmd) {
                        break;
                    }
                }
                Some(settlement) = settle_rx.recv() => {
                    worker.handle_settlement(settlement);
                }
            }
        }
        debug!(pending = worker.sync.pending_count(), "catalog runtime stopped");
    });

    CatalogHandle {
        cmd_tx,
        events_tx,
        confirm: collaborators.confirm,
    }
}

impl CatalogHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events_tx.subscribe()
    }

    pub async fn add(&self, draft: BookDraft) -> Result<BookId, CatalogError> {
        self.call(|resp| Command::Add { draft, resp }).await?
    }

    pub async fn update(&self, id: impl Into<BookId>, patch: BookPatch) -> Result<(), CatalogError> {
        let id = id.into();
        self.call(|resp| Command::Update { id, patch, resp }).await?
    }

    /// Local-only removal; no server request is made.
    pub async fn remove(&self, id: impl Into<BookId>) -> Result<Book, CatalogError> {
        let id = id.into();
        self.call(|resp| Command::Remove { id, resp }).await?
    }

    /// Validates the add form, then adds the book.
    pub async fn submit_new(&self, form: &BookForm) -> Result<BookId, CatalogError> {
        let draft = form.validate()?;
        self.add(draft).await
    }

    /// Validates the edit form, then merges it into book `id`.
    pub async fn submit_edit(&self, id: impl Into<BookId>, form: &BookForm) -> Result<(), CatalogError> {
        let patch = form.validate_patch()?;
        self.update(id, patch).await
    }

    /// Flips availability optimistically and waits for the server's verdict.
    ///
    /// The flipped value is visible to subscribers before the request is
    /// sent. A second toggle while one is outstanding is refused with
    /// [`CatalogError::MutationPending`].
    pub async fn toggle_availability(&self, id: impl Into<BookId>) -> Result<Reconciled, CatalogError> {
        let id = id.into();
        self.call(|resp| Command::ToggleAvailability { id, resp }).await?
    }

    /// Asks for confirmation, hides the book optimistically, and waits for
    /// the server. On failure the book goes back into its own slot, so
    /// overlapping deletes settle in any order without reshuffling the list.
    pub async fn request_delete(&self, id: impl Into<BookId>) -> Result<DeleteOutcome, CatalogError> {
        let id = id.into();
        let book = self
            .get(id.clone())
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if self.pending(id.clone()).await?.is_some() {
            return Err(CatalogError::MutationPending(id));
        }
        if !self.confirm.confirm(DELETE_PROMPT, &book) {
            debug!(book_id = %id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        match self.call(|resp| Command::Delete { id, resp }).await?? {
            Reconciled::Committed => Ok(DeleteOutcome::Deleted),
            Reconciled::RolledBack(err) => Ok(DeleteOutcome::Restored(err)),
        }
    }

    pub async fn get(&self, id: impl Into<BookId>) -> Result<Option<Book>, CatalogError> {
        let id = id.into();
        self.call(|resp| Command::Get { id, resp }).await
    }

    pub async fn snapshot(&self) -> Result<Vec<Book>, CatalogError> {
        let books = self.list(CatalogFilter::all()).await?;
        Ok(books.into_iter().map(|l| l.book).collect())
    }

    pub async fn list(&self, filter: CatalogFilter) -> Result<Vec<ListedBook>, CatalogError> {
        self.call(|resp| Command::List { filter, resp }).await
    }

    pub async fn pending(&self, id: impl Into<BookId>) -> Result<Option<PendingMutation>, CatalogError> {
        let id = id.into();
        self.call(|resp| Command::Pending { id, resp }).await
    }

    pub async fn shutdown(&self) -> Result<(), CatalogError> {
        self.call(|resp| Command::Shutdown { resp }).await
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, CatalogError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| CatalogError::ChannelClosed)?;
        rx.await.map_err(|_| CatalogError::ChannelClosed)
    }
}

struct Worker {
    store: CatalogStore,
    sync: OptimisticSync,
    gateway: Arc<dyn CatalogGateway>,
    notifier: Arc<dyn Notifier>,
    events_tx: broadcast::Sender<CatalogEvent>,
    waiters: HashMap<Ticket, Reply<Reconciled>>,
}

impl Worker {
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Add { draft, resp } => {
                let res = self
                    .store
                    .add(draft)
                    .map(|(id, change)| {
                        self.emit_change(&change);
                        id
                    })
                    .map_err(CatalogError::from);
                let _ = resp.send(res);
            }
            Command::Update { id, patch, resp } => {
                let res = if patch.available.is_some() && self.sync.is_pending(&id) {
                    Err(CatalogError::MutationPending(id))
                } else {
                    self.store
                        .update(&id, patch)
                        .map(|change| self.emit_change(&change))
                        .map_err(CatalogError::from)
                };
                let _ = resp.send(res);
            }
            Command::Remove { id, resp } => {
                let res = if self.sync.is_pending(&id) {
                    Err(CatalogError::MutationPending(id))
                } else {
                    self.store
                        .remove(&id)
                        .map(|(book, change)| {
                            self.emit_change(&change);
                            book
                        })
                        .map_err(CatalogError::from)
                };
                let _ = resp.send(res);
            }
            Command::ToggleAvailability { id, resp } => match self.begin_toggle(id) {
                Ok(ticket) => {
                    self.waiters.insert(ticket, resp);
                }
                Err(err) => {
                    let _ = resp.send(Err(err));
                }
            },
            Command::Delete { id, resp } => match self.begin_delete(id) {
                Ok(ticket) => {
                    self.waiters.insert(ticket, resp);
                }
                Err(err) => {
                    let _ = resp.send(Err(err));
                }
            },
            Command::Get { id, resp } => {
                let _ = resp.send(self.store.get_cloned(&id));
            }
            Command::List { filter, resp } => {
                let listed = self
                    .store
                    .filter(&filter)
                    .map(|book| ListedBook {
                        in_flight: self.sync.is_pending(&book.id),
                        book: book.clone(),
                    })
                    .collect();
                let _ = resp.send(listed);
            }
            Command::Pending { id, resp } => {
                let _ = resp.send(self.sync.pending(&id).cloned());
            }
            Command::Shutdown { resp } => {
                let _ = resp.send(());
                return true;
            }
        }

        false
    }

    fn begin_toggle(&mut self, id: BookId) -> Result<Ticket, CatalogError> {
        let current = self
            .store
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?
            .available;
        let desired = !current;

        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        let (ticket, change) = self.sync.with_optimistic_mutation(
            &mut self.store,
            Op::Patch {
                id: id.clone(),
                patch: BookPatch::availability(desired),
                prev: BookPatch::default(),
            },
            Intent::availability(current),
            async move { gateway.set_availability(&target, desired).await },
        )?;

        self.emit_change(&change);
        self.emit(CatalogEvent::InFlight { id, ticket });
        Ok(ticket)
    }

    fn begin_delete(&mut self, id: BookId) -> Result<Ticket, CatalogError> {
        let gateway = Arc::clone(&self.gateway);
        let target = id.clone();
        let (ticket, change) = self.sync.with_optimistic_mutation(
            &mut self.store,
            Op::Detach { id: id.clone() },
            Intent::removal(),
            async move { gateway.delete_book(&target).await },
        )?;

        self.emit_change(&change);
        self.emit(CatalogEvent::InFlight { id, ticket });
        Ok(ticket)
    }

    fn handle_settlement(&mut self, settlement: Settlement) {
        let Some(Reconciliation {
            mutation,
            revert,
            outcome,
        }) = self.sync.settle(&mut self.store, settlement)
        else {
            return;
        };

        if let Some(change) = &revert {
            self.emit(CatalogEvent::from_revert(change));
        }
        let committed = outcome == Reconciled::Committed;
        self.emit(CatalogEvent::Settled {
            id: mutation.target_id.clone(),
            ticket: mutation.ticket,
            committed,
        });

        let (message, kind) = notice_for(&mutation, committed);
        self.notifier.notify(message, kind);

        match self.waiters.remove(&mutation.ticket) {
            Some(resp) => {
                let _ = resp.send(Ok(outcome));
            }
            None => warn!(ticket = mutation.ticket, "no waiter for settled mutation"),
        }
    }

    fn emit_change(&self, change: &Change) {
        self.emit(CatalogEvent::from_change(change));
    }

    fn emit(&self, event: CatalogEvent) {
        let _ = self.events_tx.send(event);
    }
}

fn notice_for(mutation: &PendingMutation, committed: bool) -> (&'static str, NoticeKind) {
    match (mutation.field, committed) {
        (MutationField::Availability, true) => {
            if mutation.desired_value == FieldValue::Available(true) {
                ("Book marked as available", NoticeKind::Success)
            } else {
                ("Book marked as unavailable", NoticeKind::Success)
            }
        }
        (MutationField::Availability, false) => ("Failed to update book status", NoticeKind::Danger),
        (MutationField::Presence, true) => ("Book deleted successfully", NoticeKind::Success),
        (MutationField::Presence, false) => ("Failed to delete book", NoticeKind::Danger),
    }
}
