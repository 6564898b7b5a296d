//! Line-driven front end for the catalog core.
//!
//! Usage: `shelf [config.toml]`, then one command per line on stdin:
//! `list [term]`, `search <text>`, `toggle <id>`, `delete <id>`,
//! `add <title> | <author> | <genre>`, `edit <id> <title> | <author> | <genre>`,
//! `whoami`, `quit`.

use std::sync::Arc;

use shelfsync::{
    book::{Book, BookForm},
    config::CatalogConfig,
    core::{filter::CatalogFilter, store::CatalogStore},
    observability::init_tracing,
    runtime::handle::{Collaborators, DeleteOutcome, spawn_catalog},
    search::{
        client::{SearchClient, SearchView},
        debounce::Submitted,
        live::LiveSearch,
        query::SearchQuery,
    },
    sync::collab::{NoticeKind, Notifier},
};
use tokio::io::{AsyncBufReadExt, BufReader};

struct PrintNotifier;

impl Notifier for PrintNotifier {
    fn notify(&self, message: &str, kind: NoticeKind) {
        let tag = match kind {
            NoticeKind::Success => "ok",
            NoticeKind::Danger => "!!",
        };
        println!("[{tag}] {message}");
    }
}

fn confirm_and_echo(prompt: &str, book: &Book) -> bool {
    println!("{prompt} ({}) -> yes", book.title);
    true
}

fn parse_form(rest: &str) -> BookForm {
    let mut parts = rest.split('|').map(str::trim);
    BookForm {
        title: parts.next().unwrap_or_default().to_string(),
        author: parts.next().unwrap_or_default().to_string(),
        genre: parts.next().unwrap_or_default().to_string(),
        available: true,
    }
}

fn render_view(view: &SearchView) {
    match view {
        SearchView::Cleared => println!("(cleared)"),
        SearchView::Loading { .. } => println!("Searching..."),
        SearchView::NoResults { .. } => println!("No results found"),
        SearchView::Failed { message, .. } => println!("Error fetching results: {message}"),
        SearchView::Results(set) => {
            for hit in &set.items {
                let badge = if hit.available { "Available" } else { "Unavailable" };
                println!("{:>4}  {} by {} [{}] {badge}", hit.id, hit.title, hit.author, hit.section);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    };
    init_tracing(&config.log_filter);

    let gateway = config.gateway()?;
    let collaborators = Collaborators {
        notifier: Arc::new(PrintNotifier),
        confirm: Arc::new(confirm_and_echo),
    };
    let handle = spawn_catalog(
        CatalogStore::with_sample_books(),
        Arc::clone(&gateway),
        collaborators,
        config.runtime(),
    );
    let client = Arc::new(SearchClient::new(Arc::clone(&gateway), config.request_timeout()));
    let search = LiveSearch::spawn(client, config.quiet_period(), config.min_query_len);
    let mut search_rx = search.subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match cmd {
            "" => {}
            "quit" | "exit" => break,
            "list" => match handle.list(CatalogFilter::term(rest)).await {
                Ok(books) if books.is_empty() => println!("No books found"),
                Ok(books) => {
                    for listed in books {
                        let b = &listed.book;
                        let state = if listed.in_flight {
                            "..."
                        } else if b.available {
                            "Available"
                        } else {
                            "Borrowed"
                        };
                        println!("{:>4}  {} by {} ({}) {state}", b.id, b.title, b.author, b.genre);
                    }
                }
                Err(err) => println!("error: {err}"),
            },
            "search" => {
                search_rx.borrow_and_update();
                if search.submit_now(SearchQuery::text(rest)) == Submitted::Cleared {
                    render_view(&SearchView::Cleared);
                    continue;
                }
                let view = loop {
                    if search_rx.changed().await.is_err() {
                        break None;
                    }
                    let view = search_rx.borrow_and_update().view.clone();
                    if !matches!(view, SearchView::Loading { .. }) {
                        break Some(view);
                    }
                };
                if let Some(view) = view {
                    render_view(&view);
                }
            }
            "toggle" => match handle.toggle_availability(rest).await {
                Ok(outcome) => println!("{outcome:?}"),
                Err(err) => println!("error: {err}"),
            },
            "delete" => match handle.request_delete(rest).await {
                Ok(DeleteOutcome::Declined) => println!("kept"),
                Ok(outcome) => println!("{outcome:?}"),
                Err(err) => println!("error: {err}"),
            },
            "add" => match handle.submit_new(&parse_form(rest)).await {
                Ok(id) => println!("added {id}"),
                Err(err) => println!("error: {err}"),
            },
            "edit" => {
                let (id, form) = rest.split_once(' ').unwrap_or((rest, ""));
                match handle.submit_edit(id, &parse_form(form)).await {
                    Ok(()) => println!("updated {id}"),
                    Err(err) => println!("error: {err}"),
                }
            }
            "whoami" => match gateway.current_user().await {
                Ok(user) => match (user.username.as_deref(), user.role()) {
                    (Some(name), Some(role)) => println!("{name} ({role:?})"),
                    _ => println!("not signed in"),
                },
                Err(err) => println!("error: {err}"),
            },
            other => println!("unknown command: {other}"),
        }
    }

    handle.shutdown().await?;
    Ok(())
}
