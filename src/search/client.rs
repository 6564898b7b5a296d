use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    gateway::{CatalogGateway, GatewayResult, with_timeout},
    types::SearchSeq,
};

use super::query::{ResultSet, SearchHit, SearchQuery};

/// What the results panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchView {
    /// Nothing searched yet, or input cleared.
    Cleared,
    /// Newest request is outstanding.
    Loading {
        /// Request sequence.
        seq: SearchSeq,
    },
    /// Non-empty result set.
    Results(ResultSet),
    /// Request succeeded with zero hits.
    NoResults {
        /// Request sequence.
        seq: SearchSeq,
    },
    /// Request failed.
    Failed {
        /// Request sequence.
        seq: SearchSeq,
        /// Error text.
        message: String,
    },
}

/// Watched search state: the view plus the ordering bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    /// Current view.
    pub view: SearchView,
    /// Highest sequence whose response has been applied.
    pub highest_received: SearchSeq,
    /// Responses at or below this sequence are discarded (raised by clear).
    pub floor: SearchSeq,
    /// Input generation the view belongs to. Queries typed before the
    /// latest clear are refused by [`SearchClient::issue_in`].
    pub epoch: u64,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            view: SearchView::Cleared,
            highest_received: 0,
            floor: 0,
            epoch: 0,
        }
    }
}

impl SearchState {
    fn accepts(&self, seq: SearchSeq) -> bool {
        seq > self.highest_received && seq > self.floor
    }
}

/// Whether a response made it to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Response rendered.
    Applied,
    /// A newer response (or a clear) already superseded it.
    Stale,
}

/// Issues sequence-tagged searches and renders only the newest response.
pub struct SearchClient {
    gateway: Arc<dyn CatalogGateway>,
    next_seq: AtomicU64,
    state: watch::Sender<SearchState>,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(gateway: Arc<dyn CatalogGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            next_seq: AtomicU64::new(0),
            state: watch::Sender::new(SearchState::default()),
            timeout,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Issues and runs one search.
    pub async fn search(&self, query: SearchQuery) -> SearchOutcome {
        let seq = self.issue();
        self.run(seq, query).await
    }

    /// Reserves the next sequence number and shows the loading state.
    pub fn issue(&self) -> SearchSeq {
        let mut seq = 0;
        self.state.send_if_modified(|s| {
            seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
            if !s.accepts(seq) {
                return false;
            }
            s.view = SearchView::Loading { seq };
            true
        });
        seq
    }

    /// Like [`issue`](Self::issue), but only for input of generation `epoch`.
    ///
    /// Returns `None` once a clear of a later generation has landed. The
    /// check and the sequence reservation happen under the state lock, so a
    /// clear either sees the new sequence and floors it or refuses it here.
    pub fn issue_in(&self, epoch: u64) -> Option<SearchSeq> {
        let mut issued = None;
        self.state.send_if_modified(|s| {
            if s.epoch != epoch {
                return false;
            }
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
            s.view = SearchView::Loading { seq };
            issued = Some(seq);
            true
        });
        if issued.is_none() {
            debug!(epoch, "query from before a clear dropped");
        }
        issued
    }

    /// Sends the request for an issued `seq` and applies the response.
    pub async fn run(&self, seq: SearchSeq, query: SearchQuery) -> SearchOutcome {
        debug!(seq, text = query.trimmed(), "search dispatched");
        let res = with_timeout(self.timeout, self.gateway.search(&query)).await;
        self.apply(seq, res)
    }

    /// Clears the view and discards every response still in flight.
    pub fn clear(&self) {
        self.state.send_modify(|s| {
            s.floor = s.floor.max(self.next_seq.load(Ordering::SeqCst));
            s.view = SearchView::Cleared;
        });
    }

    /// Clears like [`clear`](Self::clear) and moves to input generation
    /// `epoch`. Earlier generations can no longer issue.
    pub fn begin_epoch(&self, epoch: u64) {
        self.state.send_modify(|s| {
            s.floor = s.floor.max(self.next_seq.load(Ordering::SeqCst));
            s.epoch = s.epoch.max(epoch);
            s.view = SearchView::Cleared;
        });
    }

    fn apply(&self, seq: SearchSeq, res: GatewayResult<Vec<SearchHit>>) -> SearchOutcome {
        let applied = self.state.send_if_modified(|s| {
            if !s.accepts(seq) {
                return false;
            }
            s.highest_received = seq;
            s.view = match res {
                Ok(items) if items.is_empty() => SearchView::NoResults { seq },
                Ok(items) => SearchView::Results(ResultSet { seq, items }),
                Err(err) => {
                    warn!(seq, error = %err, "search failed");
                    SearchView::Failed {
                        seq,
                        message: err.to_string(),
                    }
                }
            };
            true
        });

        if applied {
            SearchOutcome::Applied
        } else {
            debug!(seq, "stale search response discarded");
            SearchOutcome::Stale
        }
    }
}
