use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    book::{Book, BookDraft, BookPatch, ValidationError},
    op::{Applied, Change, Op},
    types::{BookId, ChangeSeq, Genre},
};

use super::filter::{CatalogFilter, Matches};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("book {0} not found")]
    NotFound(BookId),
    #[error("book id {0} already exists")]
    DuplicateId(BookId),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Default, Clone)]
pub struct CatalogStore {
    records: HashMap<BookId, Book>,
    /// Books hidden while their delete is in flight. Their ids keep a slot in `order`.
    detached: HashMap<BookId, Book>,
    order: Vec<BookId>,
    next_id: u64,
    next_change_seq: ChangeSeq,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_change_seq: 1,
            ..Self::default()
        }
    }

    pub fn from_books(books: impl IntoIterator<Item = Book>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for book in books {
            store.apply(Op::Insert { book, at: None })?;
        }
        Ok(store)
    }

    /// The three books the catalog starts out with when nothing else is loaded.
    pub fn with_sample_books() -> Self {
        let seed = [
            ("1", "The Great Gatsby", "F. Scott Fitzgerald", Genre::Fiction, true),
            ("2", "Dune", "Frank Herbert", Genre::ScienceFiction, true),
            ("3", "Murder on the Orient Express", "Agatha Christie", Genre::Mystery, false),
        ];

        let mut store = Self::new();
        for (id, title, author, genre, available) in seed {
            store.records.insert(
                id.to_string(),
                Book {
                    id: id.to_string(),
                    title: title.to_string(),
                    author: author.to_string(),
                    genre,
                    available,
                },
            );
            store.order.push(id.to_string());
        }
        store.next_id = 4;
        store
    }

    /// Adds a book, assigning a fresh id when the draft has none.
    pub fn add(&mut self, draft: BookDraft) -> Result<(BookId, Change), StoreError> {
        let explicit = draft.id.clone();
        let mut book = draft.into_book(BookId::new());
        book.check()?;
        book.id = match explicit {
            Some(id) => id,
            None => self.fresh_id(),
        };

        let id = book.id.clone();
        let (change, _) = self.apply(Op::Insert { book, at: None })?;
        Ok((id, change))
    }

    pub fn update(&mut self, id: &str, patch: BookPatch) -> Result<Change, StoreError> {
        let (change, _) = self.apply(Op::Patch {
            id: id.to_string(),
            patch,
            prev: BookPatch::default(),
        })?;
        Ok(change)
    }

    pub fn remove(&mut self, id: &str) -> Result<(Book, Change), StoreError> {
        let book = self.get_cloned(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let (change, _) = self.apply(Op::Remove { id: id.to_string() })?;
        Ok((book, change))
    }

    /// Applies `op` and returns the change record plus the op that undoes it.
    ///
    /// The `prev` of an [`Op::Patch`] is recomputed from the current record,
    /// so callers may pass a default.
    pub fn apply(&mut self, op: Op) -> Result<(Change, Op), StoreError> {
        match op {
            Op::Insert { book, at } => self.apply_insert(book, at),
            Op::Patch { id, patch, .. } => self.apply_patch(id, patch),
            Op::Remove { id } => self.apply_remove(id),
            Op::Detach { id } => self.apply_detach(id),
            Op::Reattach { id } => self.apply_reattach(id),
        }
    }

    /// Drops a detached book for good, freeing its slot. Returns false when
    /// `id` was not detached.
    pub fn purge_detached(&mut self, id: &str) -> bool {
        if self.detached.remove(id).is_none() {
            return false;
        }
        self.order.retain(|x| x != id);
        true
    }

    pub fn filter(&self, filter: &CatalogFilter) -> Matches<'_> {
        Matches::new(&self.order, &self.records, filter)
    }

    pub fn get(&self, id: &str) -> Option<&Book> {
        self.records.get(id)
    }

    pub fn get_cloned(&self, id: &str) -> Option<Book> {
        self.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn is_detached(&self, id: &str) -> bool {
        self.detached.contains_key(id)
    }

    /// Index of `id` among visible books.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        let slot = self.slot_of(id)?;
        self.records.contains_key(id).then(|| self.visible_before(slot))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn books(&self) -> impl Iterator<Item = &Book> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn snapshot(&self) -> Vec<Book> {
        self.books().cloned().collect()
    }

    /// Visible ids in catalog order.
    pub fn ordered_ids(&self) -> Vec<BookId> {
        self.books().map(|b| b.id.clone()).collect()
    }

    pub fn latest_change_seq(&self) -> ChangeSeq {
        self.next_change_seq.saturating_sub(1)
    }

    fn apply_insert(&mut self, book: Book, at: Option<usize>) -> Result<(Change, Op), StoreError> {
        if self.records.contains_key(&book.id) || self.detached.contains_key(&book.id) {
            return Err(StoreError::DuplicateId(book.id));
        }
        book.check()?;

        let id = book.id.clone();
        if let Some(next) = id.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
            self.next_id = self.next_id.max(next);
        }

        let slot = at.map_or(self.order.len(), |i| i.min(self.order.len()));
        self.order.insert(slot, id.clone());
        self.records.insert(id.clone(), book);

        let index = self.visible_before(slot);
        let inverse = Op::Remove { id: id.clone() };
        Ok((self.change(Applied::Inserted { id, index }), inverse))
    }

    fn apply_patch(&mut self, id: BookId, patch: BookPatch) -> Result<(Change, Op), StoreError> {
        let rec = self
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.check()?;

        let prev = patch.capture_inverse_for(rec);
        patch.apply_to(rec);

        let inverse = Op::Patch {
            id: id.clone(),
            patch: prev,
            prev: patch,
        };
        Ok((self.change(Applied::Patched { id }), inverse))
    }

    fn apply_remove(&mut self, id: BookId) -> Result<(Change, Op), StoreError> {
        let slot = self
            .slot_of(&id)
            .filter(|_| self.records.contains_key(&id))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let index = self.visible_before(slot);
        self.order.remove(slot);
        let book = self
            .records
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let inverse = Op::Insert {
            book,
            at: Some(slot),
        };
        Ok((self.change(Applied::Removed { id, index }), inverse))
    }

    fn apply_detach(&mut self, id: BookId) -> Result<(Change, Op), StoreError> {
        let slot = self
            .slot_of(&id)
            .filter(|_| self.records.contains_key(&id))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let index = self.visible_before(slot);
        let book = self
            .records
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.detached.insert(id.clone(), book);

        let inverse = Op::Reattach { id: id.clone() };
        Ok((self.change(Applied::Removed { id, index }), inverse))
    }

    fn apply_reattach(&mut self, id: BookId) -> Result<(Change, Op), StoreError> {
        let slot = self
            .slot_of(&id)
            .filter(|_| self.detached.contains_key(&id))
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let book = self
            .detached
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.records.insert(id.clone(), book);

        let index = self.visible_before(slot);
        let inverse = Op::Detach { id: id.clone() };
        Ok((self.change(Applied::Inserted { id, index }), inverse))
    }

    fn slot_of(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|x| x == id)
    }

    /// Number of visible books in `order[..slot]`.
    fn visible_before(&self, slot: usize) -> usize {
        self.order[..slot]
            .iter()
            .filter(|id| self.records.contains_key(*id))
            .count()
    }

    fn change(&mut self, applied: Applied) -> Change {
        let seq = self.next_change_seq;
        self.next_change_seq += 1;
        Change { seq, applied }
    }

    fn fresh_id(&mut self) -> BookId {
        loop {
            let id = self.next_id.to_string();
            self.next_id = self.next_id.wrapping_add(1);
            if !self.records.contains_key(&id) && !self.detached.contains_key(&id) {
                return id;
            }
        }
    }
}
