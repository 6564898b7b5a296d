use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::watch;

use shelfsync::{
    gateway::{CatalogGateway, GatewayError, GatewayResult, UserStatus, local::LocalGateway},
    search::{
        client::{SearchClient, SearchOutcome, SearchState, SearchView},
        debounce::{Debouncer, Submitted},
        live::LiveSearch,
        query::{SearchHit, SearchQuery},
    },
};

const TIMEOUT: Duration = Duration::from_secs(10);
const QUIET: Duration = Duration::from_millis(300);

/// Sample-shelf gateway with per-query latency and a failing query.
struct SlowShelf {
    inner: LocalGateway,
    delays: Vec<(&'static str, Duration)>,
    fail_on: Option<&'static str>,
    seen: Mutex<Vec<String>>,
}

impl SlowShelf {
    fn new(delays: Vec<(&'static str, Duration)>) -> Self {
        Self {
            inner: LocalGateway::in_memory().unwrap(),
            delays,
            fail_on: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, text: &'static str) -> Self {
        self.fail_on = Some(text);
        self
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogGateway for SlowShelf {
    async fn search(&self, query: &SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        let text = query.trimmed().to_string();
        self.seen.lock().unwrap().push(text.clone());

        let delay = self
            .delays
            .iter()
            .find(|(t, _)| *t == text)
            .map(|(_, d)| *d)
            .unwrap_or_default();
        tokio::time::sleep(delay).await;

        if self.fail_on == Some(text.as_str()) {
            return Err(GatewayError::Rejected { status: Some(503) });
        }
        self.inner.search(query).await
    }

    async fn set_availability(&self, id: &str, available: bool) -> GatewayResult<()> {
        self.inner.set_availability(id, available).await
    }

    async fn delete_book(&self, id: &str) -> GatewayResult<()> {
        self.inner.delete_book(id).await
    }

    async fn current_user(&self) -> GatewayResult<UserStatus> {
        Ok(UserStatus::default())
    }
}

async fn settled_view(rx: &mut watch::Receiver<SearchState>) -> SearchView {
    loop {
        let view = rx.borrow_and_update().view.clone();
        if !matches!(view, SearchView::Loading { .. } | SearchView::Cleared) {
            return view;
        }
        rx.changed().await.unwrap();
    }
}

fn titles(view: &SearchView) -> Vec<String> {
    match view {
        SearchView::Results(set) => set.items.iter().map(|h| h.title.clone()).collect(),
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slower_older_response_never_overwrites_newer_one() {
    let gateway = Arc::new(SlowShelf::new(vec![
        ("gat", Duration::from_millis(500)),
        ("dune", Duration::from_millis(10)),
    ]));
    let client = SearchClient::new(gateway, TIMEOUT);

    let (first, second) = tokio::join!(client.search(SearchQuery::text("gat")), async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        client.search(SearchQuery::text("dune")).await
    });

    assert_eq!(first, SearchOutcome::Stale);
    assert_eq!(second, SearchOutcome::Applied);

    let state = client.state();
    assert_eq!(state.highest_received, 2);
    assert_eq!(titles(&state.view), ["Dune"]);
}

#[tokio::test]
async fn loading_shows_until_the_newest_response_lands() {
    let gateway = Arc::new(SlowShelf::new(Vec::new()));
    let client = SearchClient::new(gateway, TIMEOUT);

    let seq = client.issue();
    assert_eq!(client.state().view, SearchView::Loading { seq });

    assert_eq!(client.run(seq, SearchQuery::text("mockingbird")).await, SearchOutcome::Applied);
    assert_eq!(titles(&client.state().view), ["To Kill a Mockingbird"]);
}

#[tokio::test]
async fn empty_result_is_distinct_from_cleared() {
    let gateway = Arc::new(SlowShelf::new(Vec::new()));
    let client = SearchClient::new(gateway, TIMEOUT);

    client.search(SearchQuery::text("zzzz")).await;

    assert_eq!(client.state().view, SearchView::NoResults { seq: 1 });
    client.clear();
    assert_eq!(client.state().view, SearchView::Cleared);
}

#[tokio::test]
async fn failed_request_renders_error_state() {
    let gateway = Arc::new(SlowShelf::new(Vec::new()).failing_on("boom"));
    let client = SearchClient::new(gateway, TIMEOUT);

    assert_eq!(client.search(SearchQuery::text("boom")).await, SearchOutcome::Applied);

    match client.state().view {
        SearchView::Failed { seq, message } => {
            assert_eq!(seq, 1);
            assert!(message.contains("503"), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_search_times_out_into_error_state() {
    let gateway = Arc::new(SlowShelf::new(vec![("dune", Duration::from_secs(60))]));
    let client = SearchClient::new(gateway, Duration::from_secs(2));

    client.search(SearchQuery::text("dune")).await;

    assert!(matches!(client.state().view, SearchView::Failed { seq: 1, .. }));
}

#[tokio::test(start_paused = true)]
async fn clear_discards_responses_still_in_flight() {
    let gateway = Arc::new(SlowShelf::new(vec![("gat", Duration::from_millis(500))]));
    let client = Arc::new(SearchClient::new(gateway, TIMEOUT));

    let searching = Arc::clone(&client);
    let task = tokio::spawn(async move { searching.search(SearchQuery::text("gat")).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    client.clear();

    assert_eq!(task.await.unwrap(), SearchOutcome::Stale);
    assert_eq!(client.state().view, SearchView::Cleared);
}

#[tokio::test(start_paused = true)]
async fn debouncer_fires_only_the_last_query_after_quiet_period() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let cleared = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    let clears = cleared.clone();
    let debouncer = Debouncer::spawn(
        QUIET,
        2,
        move |q: SearchQuery, _| sink.lock().unwrap().push(q.trimmed().to_string()),
        move |generation| clears.lock().unwrap().push(generation),
    );

    for text in ["ga", "gat", "gats"] {
        assert_eq!(debouncer.submit(SearchQuery::text(text)), Submitted::Scheduled);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(fired.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(*fired.lock().unwrap(), ["gats"]);

    assert_eq!(debouncer.submit_now(SearchQuery::text("dune")), Submitted::Scheduled);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(*fired.lock().unwrap(), ["gats", "dune"]);
    assert!(cleared.lock().unwrap().is_empty());
    assert_eq!(debouncer.generation(), 0);
}

#[tokio::test(start_paused = true)]
async fn blank_input_cancels_pending_query_and_clears_synchronously() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let cleared = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    let clears = cleared.clone();
    let debouncer = Debouncer::spawn(
        QUIET,
        2,
        move |q: SearchQuery, _| sink.lock().unwrap().push(q.trimmed().to_string()),
        move |generation| clears.lock().unwrap().push(generation),
    );

    debouncer.submit(SearchQuery::text("dune"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(debouncer.submit(SearchQuery::text(" d ")), Submitted::Cleared);
    assert_eq!(*cleared.lock().unwrap(), [1]);
    assert_eq!(debouncer.generation(), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(fired.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn typing_gat_shows_gatsby_after_one_request() {
    let gateway = Arc::new(SlowShelf::new(vec![("gat", Duration::from_millis(40))]));
    let client = Arc::new(SearchClient::new(gateway.clone(), TIMEOUT));
    let search = LiveSearch::spawn(client, QUIET, 2);
    let mut rx = search.subscribe();

    assert_eq!(search.input(SearchQuery::text("g")), Submitted::Cleared);
    for text in ["ga", "gat"] {
        assert_eq!(search.input(SearchQuery::text(text)), Submitted::Scheduled);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let view = settled_view(&mut rx).await;
    let found = titles(&view);
    assert!(found.contains(&"The Great Gatsby".to_string()));
    assert!(!found.contains(&"Dune".to_string()));
    assert_eq!(gateway.seen(), ["gat"]);

    assert_eq!(search.input(SearchQuery::text("")), Submitted::Cleared);
    assert_eq!(search.state().view, SearchView::Cleared);
}

#[tokio::test(start_paused = true)]
async fn clearing_supersedes_a_fired_but_unanswered_query() {
    let gateway = Arc::new(SlowShelf::new(vec![("dune", Duration::from_millis(500))]));
    let client = Arc::new(SearchClient::new(gateway.clone(), TIMEOUT));
    let search = LiveSearch::spawn(client, QUIET, 2);

    search.submit_now(SearchQuery::text("dune"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(search.state().view, SearchView::Loading { .. }));

    search.input(SearchQuery::text(""));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(gateway.seen(), ["dune"]);
    assert_eq!(search.state().view, SearchView::Cleared);
}

#[tokio::test(start_paused = true)]
async fn fires_carry_the_generation_of_their_input() {
    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = fired.clone();
    let debouncer = Debouncer::spawn(
        QUIET,
        2,
        move |q: SearchQuery, generation| {
            sink.lock().unwrap().push((q.trimmed().to_string(), generation));
        },
        |_| {},
    );

    debouncer.submit_now(SearchQuery::text("gat"));
    debouncer.submit(SearchQuery::text(""));
    debouncer.submit_now(SearchQuery::text("dune"));
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(
        *fired.lock().unwrap(),
        [("gat".to_string(), 0), ("dune".to_string(), 1)]
    );
}

#[test]
fn clear_refuses_queries_typed_before_it() {
    let gateway = Arc::new(SlowShelf::new(Vec::new()));
    let client = SearchClient::new(gateway, TIMEOUT);

    client.begin_epoch(1);

    assert_eq!(client.issue_in(0), None);
    assert_eq!(client.state().view, SearchView::Cleared);
    assert_eq!(client.issue_in(1), Some(1));
    assert_eq!(client.state().view, SearchView::Loading { seq: 1 });
}

#[tokio::test]
async fn query_issued_just_before_a_clear_is_discarded() {
    let gateway = Arc::new(SlowShelf::new(Vec::new()));
    let client = SearchClient::new(gateway, TIMEOUT);

    let seq = client.issue_in(0).expect("current generation");
    client.begin_epoch(1);

    assert_eq!(client.run(seq, SearchQuery::text("dune")).await, SearchOutcome::Stale);
    assert_eq!(client.state().view, SearchView::Cleared);
    assert_eq!(client.state().epoch, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clear_right_after_a_fire_wins_on_a_threaded_runtime() {
    let gateway = Arc::new(SlowShelf::new(Vec::new()));
    let client = Arc::new(SearchClient::new(gateway, TIMEOUT));
    let search = LiveSearch::spawn(client, QUIET, 2);

    for _ in 0..50 {
        search.submit_now(SearchQuery::text("dune"));
        search.input(SearchQuery::text(""));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(search.state().view, SearchView::Cleared);
    }
}
