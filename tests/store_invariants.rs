use std::collections::HashSet;

use proptest::prelude::*;

use shelfsync::{
    book::{Book, BookDraft, BookPatch},
    core::{
        filter::CatalogFilter,
        store::{CatalogStore, StoreError},
    },
    op::Op,
    types::{BookId, Genre},
};

const TITLES: [&str; 6] = [
    "The Great Gatsby",
    "Dune",
    "Great Expectations",
    "Gattaca Notes",
    "Emma",
    "dune messiah",
];

#[derive(Debug, Clone)]
enum Action {
    Add { explicit: Option<u8>, title: u8, genre: u8 },
    Retitle { target: u8, title: u8 },
    Toggle { target: u8 },
    Remove { target: u8 },
    RemoveAbsent,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (prop::option::of(0u8..16), 0u8..6, 0u8..5)
            .prop_map(|(explicit, title, genre)| Action::Add { explicit, title, genre }),
        (0u8..32, 0u8..6).prop_map(|(target, title)| Action::Retitle { target, title }),
        (0u8..32).prop_map(|target| Action::Toggle { target }),
        (0u8..32).prop_map(|target| Action::Remove { target }),
        Just(Action::RemoveAbsent),
    ]
}

fn filter_strategy() -> impl Strategy<Value = CatalogFilter> {
    (
        prop_oneof![Just(""), Just("gat"), Just("GREAT"), Just("dune"), Just("x")],
        prop::option::of(0u8..5),
    )
        .prop_map(|(term, genre)| CatalogFilter {
            search_term: term.to_string(),
            genre: genre.map(|g| Genre::ALL[usize::from(g)]),
        })
}

fn pick(store: &CatalogStore, target: u8) -> Option<BookId> {
    let ids = store.ordered_ids();
    if ids.is_empty() {
        return None;
    }
    Some(ids[usize::from(target) % ids.len()].clone())
}

fn full_scan(store: &CatalogStore, filter: &CatalogFilter) -> Vec<Book> {
    store
        .books()
        .filter(|b| {
            filter.genre.is_none_or(|g| g == b.genre)
                && b.title
                    .to_lowercase()
                    .contains(&filter.search_term.to_lowercase())
        })
        .cloned()
        .collect()
}

proptest! {
    #[test]
    fn random_sequences_keep_ids_unique_and_filter_consistent(
        actions in prop::collection::vec(action_strategy(), 1..150),
        filters in prop::collection::vec(filter_strategy(), 1..4),
    ) {
        let mut store = CatalogStore::new();

        for action in actions {
            match action {
                Action::Add { explicit, title, genre } => {
                    let mut draft = BookDraft::new(
                        TITLES[usize::from(title)],
                        "Someone",
                        Genre::ALL[usize::from(genre)],
                    );
                    if let Some(n) = explicit {
                        draft = draft.with_id(n.to_string());
                    }
                    let existed = draft.id.as_deref().is_some_and(|id| store.contains(id));
                    let res = store.add(draft);
                    prop_assert_eq!(res.is_err(), existed);
                    if let Err(err) = res {
                        prop_assert!(matches!(err, StoreError::DuplicateId(_)));
                    }
                }
                Action::Retitle { target, title } => {
                    let Some(id) = pick(&store, target) else { continue; };
                    let patch = BookPatch {
                        title: Some(TITLES[usize::from(title)].to_string()),
                        ..BookPatch::default()
                    };
                    store.update(&id, patch).expect("update existing");
                }
                Action::Toggle { target } => {
                    let Some(id) = pick(&store, target) else { continue; };
                    let available = store.get(&id).expect("present").available;
                    store.update(&id, BookPatch::availability(!available)).expect("toggle");
                }
                Action::Remove { target } => {
                    let Some(id) = pick(&store, target) else { continue; };
                    store.remove(&id).expect("remove existing");
                    prop_assert_eq!(store.remove(&id).unwrap_err(), StoreError::NotFound(id));
                }
                Action::RemoveAbsent => {
                    prop_assert!(store.remove("absent").is_err());
                }
            }

            let ids: HashSet<BookId> = store.ordered_ids().into_iter().collect();
            prop_assert_eq!(ids.len(), store.len());

            for filter in &filters {
                let lazy: Vec<Book> = store.filter(filter).cloned().collect();
                for book in &lazy {
                    prop_assert_eq!(store.get(&book.id), Some(book));
                }
                prop_assert_eq!(lazy, full_scan(&store, filter));
            }
        }
    }

    #[test]
    fn double_toggle_is_identity(target in 0u8..3) {
        let mut store = CatalogStore::with_sample_books();
        let before = store.snapshot();
        let id = pick(&store, target).expect("seeded");

        for _ in 0..2 {
            let available = store.get(&id).expect("present").available;
            store.update(&id, BookPatch::availability(!available)).expect("toggle");
        }

        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn removal_inverse_restores_position_and_fields(
        count in 1usize..12,
        target in 0u8..32,
    ) {
        let mut store = CatalogStore::new();
        for i in 0..count {
            let genre = Genre::ALL[i % Genre::ALL.len()];
            store
                .add(BookDraft::new(format!("Book {i}"), "Author", genre).with_available(i % 2 == 0))
                .expect("add");
        }
        let before = store.snapshot();
        let id = pick(&store, target).expect("non-empty");

        let (_, inverse) = store.apply(Op::Remove { id: id.clone() }).expect("remove");
        prop_assert!(!store.contains(&id));
        store.apply(inverse).expect("reinstate");

        prop_assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn overlapping_detaches_settle_back_into_catalog_order(
        count in 2usize..10,
        picks in prop::collection::vec((0u8..32, any::<bool>()), 1..6),
        rotate in 0usize..6,
        reverse in any::<bool>(),
    ) {
        let mut store = CatalogStore::new();
        for i in 0..count {
            store
                .add(BookDraft::new(format!("Book {i}"), "Author", Genre::Fiction))
                .expect("add");
        }
        let before = store.snapshot();

        let mut pending = Vec::new();
        for (target, commit) in picks {
            let Some(id) = pick(&store, target) else { break; };
            let (_, undo) = store.apply(Op::Detach { id: id.clone() }).expect("detach");
            pending.push((id, undo, commit));
        }
        if reverse {
            pending.reverse();
        }
        let len = pending.len();
        pending.rotate_left(rotate % len);

        let mut committed = HashSet::new();
        for (id, undo, commit) in pending {
            if commit {
                prop_assert!(store.purge_detached(&id));
                committed.insert(id);
            } else {
                store.apply(undo).expect("reattach");
            }
        }

        let expected: Vec<Book> = before
            .into_iter()
            .filter(|b| !committed.contains(&b.id))
            .collect();
        prop_assert_eq!(store.snapshot(), expected);
    }
}
