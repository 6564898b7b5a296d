use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use super::{
    client::{SearchClient, SearchState},
    debounce::{Debouncer, Submitted},
    query::SearchQuery,
};

/// Search box: debounced input feeding a sequence-ordered client.
///
/// Every fired query gets its sequence number at fire time, so a clear
/// issued afterwards always supersedes it. A fire that loses the race with a
/// clear on another worker thread is dropped by its generation.
pub struct LiveSearch {
    client: Arc<SearchClient>,
    debouncer: Debouncer,
}

impl LiveSearch {
    pub fn spawn(client: Arc<SearchClient>, quiet: Duration, min_len: usize) -> Self {
        let fire_client = Arc::clone(&client);
        let clear_client = Arc::clone(&client);

        let debouncer = Debouncer::spawn(
            quiet,
            min_len,
            move |query, generation| {
                let client = Arc::clone(&fire_client);
                let Some(seq) = client.issue_in(generation) else {
                    return;
                };
                tokio::spawn(async move {
                    client.run(seq, query).await;
                });
            },
            move |generation| clear_client.begin_epoch(generation),
        );

        Self { client, debouncer }
    }

    pub fn input(&self, query: SearchQuery) -> Submitted {
        self.debouncer.submit(query)
    }

    pub fn submit_now(&self, query: SearchQuery) -> Submitted {
        self.debouncer.submit_now(query)
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.client.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.client.state()
    }
}
