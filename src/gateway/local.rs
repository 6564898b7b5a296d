//! In-process gateway for running without a backend.
//!
//! Search answers from a fixed sample shelf, mutations are accepted
//! immediately, and auth state lives in a [`LocalStore`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    persist::{LocalStore, PersistError, sqlite::SqliteLocalStore},
    search::query::{SearchHit, SearchQuery},
};

use super::{CatalogGateway, GatewayError, GatewayResult, UserStatus};

/// Storage key holding the serialized [`UserStatus`].
pub const AUTH_KEY: &str = "authData";

/// Most hits a single search returns.
pub const SEARCH_LIMIT: usize = 10;

/// One book on the sample shelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBook {
    /// Book id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// ISBN, also searchable.
    pub isbn: String,
    /// Section id used by the section filter.
    pub section_id: String,
    /// Section display name.
    pub section: String,
    /// Availability.
    pub available: bool,
}

impl SampleBook {
    fn matches(&self, needle: &str, section: Option<&str>) -> bool {
        let section_ok = section.is_none_or(|s| s == self.section_id);
        let text_ok = needle.is_empty()
            || [&self.title, &self.author, &self.isbn]
                .iter()
                .any(|field| field.to_lowercase().contains(needle));
        section_ok && text_ok
    }

    fn to_hit(&self) -> SearchHit {
        SearchHit {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            section: self.section.clone(),
            available: self.available,
        }
    }
}

/// The built-in shelf used when no dataset is supplied.
pub fn sample_shelf() -> Vec<SampleBook> {
    let rows = [
        ("1", "The Great Gatsby", "F. Scott Fitzgerald", "9780743273565", "1", "Classics", true),
        ("2", "To Kill a Mockingbird", "Harper Lee", "9780061120084", "1", "Classics", true),
        ("3", "Dune", "Frank Herbert", "9780441172719", "2", "Science Fiction", true),
        ("4", "Murder on the Orient Express", "Agatha Christie", "9780062693662", "3", "Mystery", false),
        ("5", "Pride and Prejudice", "Jane Austen", "9780141439518", "4", "Romance", true),
    ];
    rows.into_iter()
        .map(|(id, title, author, isbn, section_id, section, available)| SampleBook {
            id: id.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            section_id: section_id.to_string(),
            section: section.to_string(),
            available,
        })
        .collect()
}

/// Static-mode gateway.
pub struct LocalGateway {
    shelf: Vec<SampleBook>,
    storage: Arc<Mutex<Box<dyn LocalStore>>>,
}

impl LocalGateway {
    /// Gateway over `shelf` with auth state kept in `storage`.
    pub fn new(shelf: Vec<SampleBook>, storage: Box<dyn LocalStore>) -> Self {
        Self {
            shelf,
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    /// Sample shelf with throwaway in-memory auth storage.
    pub fn in_memory() -> Result<Self, PersistError> {
        Ok(Self::new(
            sample_shelf(),
            Box::new(SqliteLocalStore::open_in_memory()?),
        ))
    }

    /// Records `user` as the signed-in user.
    pub async fn sign_in(&self, user: &UserStatus) -> GatewayResult<()> {
        let payload = serde_json::to_string(user).map_err(|e| GatewayError::Storage(e.to_string()))?;
        self.with_storage(move |store| store.set(AUTH_KEY, &payload)).await
    }

    /// Forgets the signed-in user.
    pub async fn sign_out(&self) -> GatewayResult<()> {
        self.with_storage(|store| store.remove(AUTH_KEY).map(|_| ())).await
    }

    async fn with_storage<T, F>(&self, f: F) -> GatewayResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Box<dyn LocalStore>) -> Result<T, PersistError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || {
            let mut store = storage.blocking_lock();
            f(&mut store)
        })
        .await
        .map_err(|e| GatewayError::Storage(format!("join error: {e}")))?
        .map_err(|e| GatewayError::Storage(e.to_string()))
    }
}

#[async_trait]
impl CatalogGateway for LocalGateway {
    async fn search(&self, query: &SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        let needle = query.trimmed().to_lowercase();
        let section = query.section_id();
        if needle.is_empty() && section.is_none() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<&SampleBook> = self
            .shelf
            .iter()
            .filter(|b| b.matches(&needle, section))
            .collect();
        hits.sort_by(|a, b| a.title.cmp(&b.title));
        debug!(text = query.trimmed(), hits = hits.len(), "local search");

        Ok(hits.into_iter().take(SEARCH_LIMIT).map(SampleBook::to_hit).collect())
    }

    async fn set_availability(&self, id: &str, available: bool) -> GatewayResult<()> {
        debug!(book_id = id, available, "local toggle accepted");
        Ok(())
    }

    async fn delete_book(&self, id: &str) -> GatewayResult<()> {
        debug!(book_id = id, "local delete accepted");
        Ok(())
    }

    async fn current_user(&self) -> GatewayResult<UserStatus> {
        let raw = self.with_storage(|store| store.get(AUTH_KEY)).await?;
        match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| GatewayError::Malformed(e.to_string())),
            None => Ok(UserStatus::default()),
        }
    }
}
