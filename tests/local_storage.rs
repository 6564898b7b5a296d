use tempfile::tempdir;

use shelfsync::{
    config::CatalogConfig,
    gateway::{
        CatalogGateway, Role, UserStatus,
        local::{AUTH_KEY, LocalGateway, sample_shelf},
    },
    persist::{LocalStore, sqlite::SqliteLocalStore},
    search::query::SearchQuery,
};

fn librarian() -> UserStatus {
    UserStatus {
        authenticated: true,
        username: Some("marian".to_string()),
        is_admin: false,
        is_librarian: true,
    }
}

#[tokio::test]
async fn sign_in_survives_reopening_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shelf.sqlite");

    {
        let store = SqliteLocalStore::open(&path).unwrap();
        let gateway = LocalGateway::new(sample_shelf(), Box::new(store));
        assert_eq!(gateway.current_user().await.unwrap(), UserStatus::default());
        gateway.sign_in(&librarian()).await.unwrap();
    }

    let store = SqliteLocalStore::open(&path).unwrap();
    let raw = store.get(AUTH_KEY).unwrap().expect("auth persisted");
    assert!(raw.contains("marian"));

    let gateway = LocalGateway::new(sample_shelf(), Box::new(store));
    let user = gateway.current_user().await.unwrap();
    assert_eq!(user, librarian());
    assert_eq!(user.role(), Some(Role::Librarian));

    gateway.sign_out().await.unwrap();
    assert!(!gateway.current_user().await.unwrap().authenticated);
}

#[tokio::test]
async fn configured_storage_path_backs_the_local_gateway() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("auth.sqlite");
    let raw = format!(
        "[backend]\nkind = \"local\"\nstorage_path = {:?}\n",
        path.to_string_lossy()
    );
    let config = CatalogConfig::from_toml_str(&raw).unwrap();

    let gateway = config.gateway().unwrap();
    let hits = gateway.search(&SearchQuery::text("austen")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Pride and Prejudice");

    let store = SqliteLocalStore::open(&path).unwrap();
    assert_eq!(store.get(AUTH_KEY).unwrap(), None);
}

#[tokio::test]
async fn section_filter_alone_lists_the_section_by_title() {
    let gateway = LocalGateway::in_memory().unwrap();

    let hits = gateway
        .search(&SearchQuery::text("").in_section("1"))
        .await
        .unwrap();
    let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, ["The Great Gatsby", "To Kill a Mockingbird"]);

    assert!(gateway.search(&SearchQuery::text("")).await.unwrap().is_empty());
    let by_isbn = gateway.search(&SearchQuery::text("9780441172719")).await.unwrap();
    assert_eq!(by_isbn[0].title, "Dune");
}

#[test]
fn storage_overwrites_and_removes_keys() {
    let dir = tempdir().unwrap();
    let mut store = SqliteLocalStore::open(dir.path().join("kv.sqlite")).unwrap();

    store.set("theme", "dark").unwrap();
    store.set("theme", "light").unwrap();
    assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));

    assert!(store.remove("theme").unwrap());
    assert!(!store.remove("theme").unwrap());
    assert_eq!(store.get("theme").unwrap(), None);
}
