use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    sync::mpsc,
    time::{Duration, Instant},
};
use tracing::trace;

use super::query::SearchQuery;

/// Quiet period the search box waits for by default.
pub const DEFAULT_QUIET: Duration = Duration::from_millis(300);

/// What [`Debouncer::submit`] did with a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Timer (re)armed.
    Scheduled,
    /// Query was empty-ish; pending timer cancelled and results cleared.
    Cleared,
}

enum Msg {
    Submit(SearchQuery, u64),
    Now(SearchQuery, u64),
    Cancel,
}

/// Collapses keystrokes into one trailing query per quiet period.
///
/// A single timer task owns the pending query; dropping the debouncer stops it.
///
/// Every clear starts a new generation. Both callbacks receive the generation
/// their input belongs to, so a fire racing a clear on another worker thread
/// can be told apart from input typed after it.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<Msg>,
    on_clear: Arc<dyn Fn(u64) + Send + Sync>,
    generation: AtomicU64,
    min_len: usize,
}

impl Debouncer {
    pub fn spawn<F, C>(quiet: Duration, min_len: usize, on_fire: F, on_clear: C) -> Self
    where
        F: Fn(SearchQuery, u64) + Send + 'static,
        C: Fn(u64) + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();

        tokio::spawn(async move {
            let mut pending: Option<(SearchQuery, u64)> = None;
            let mut deadline = Instant::now() + quiet;

            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => {
                        let Some(msg) = msg else { break; };
                        match msg {
                            Msg::Submit(query, generation) => {
                                pending = Some((query, generation));
                                deadline = Instant::now() + quiet;
                            }
                            Msg::Now(query, generation) => {
                                pending = None;
                                on_fire(query, generation);
                            }
                            Msg::Cancel => {
                                pending = None;
                            }
                        }
                    }
                    _ = tokio::time::sleep_until(deadline), if pending.is_some() => {
                        if let Some((query, generation)) = pending.take() {
                            trace!(text = query.trimmed(), generation, "debounce fired");
                            on_fire(query, generation);
                        }
                    }
                }
            }
        });

        Self {
            tx,
            on_clear: Arc::new(on_clear),
            generation: AtomicU64::new(0),
            min_len,
        }
    }

    /// Call on every keystroke.
    ///
    /// Empty-ish input clears results right here, before returning, and
    /// cancels whatever was scheduled.
    pub fn submit(&self, query: SearchQuery) -> Submitted {
        if query.is_blank(self.min_len) {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.tx.send(Msg::Cancel);
            (self.on_clear)(generation);
            return Submitted::Cleared;
        }
        let _ = self.tx.send(Msg::Submit(query, self.generation()));
        Submitted::Scheduled
    }

    /// Fires immediately, skipping the quiet period (section change, form
    /// submit). Empty-ish input clears instead.
    pub fn submit_now(&self, query: SearchQuery) -> Submitted {
        if query.is_blank(self.min_len) {
            return self.submit(query);
        }
        let _ = self.tx.send(Msg::Now(query, self.generation()));
        Submitted::Scheduled
    }

    /// Number of clears so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
