//! Book record, draft, patch, and form types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BookId, Genre};

/// Fully materialized catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Stable identifier, unique within a catalog.
    pub id: BookId,
    /// Non-empty title.
    pub title: String,
    /// Non-empty author.
    pub author: String,
    /// Genre from the closed set.
    pub genre: Genre,
    /// Whether the book can currently be borrowed.
    pub available: bool,
}

impl Book {
    /// Rejects records whose title or author is blank.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        Ok(())
    }
}

/// Insert payload used to create a new [`Book`].
///
/// When `id` is `None` the store assigns a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    /// Explicit id, if the caller already has one.
    pub id: Option<BookId>,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Genre.
    pub genre: Genre,
    /// Availability.
    pub available: bool,
}

impl BookDraft {
    /// Draft without an explicit id, available by default.
    pub fn new(title: impl Into<String>, author: impl Into<String>, genre: Genre) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            genre,
            available: true,
        }
    }

    /// Sets an explicit id.
    pub fn with_id(mut self, id: impl Into<BookId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets availability.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub(crate) fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            genre: self.genre,
            available: self.available,
        }
    }
}

/// Sparse patch where each `Some` field overwrites the record value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookPatch {
    /// Optional replacement title.
    pub title: Option<String>,
    /// Optional replacement author.
    pub author: Option<String>,
    /// Optional replacement genre.
    pub genre: Option<Genre>,
    /// Optional replacement availability.
    pub available: Option<bool>,
}

impl BookPatch {
    /// Patch that only sets availability.
    pub fn availability(available: bool) -> Self {
        Self {
            available: Some(available),
            ..Self::default()
        }
    }

    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Rejects patches that would blank out the title or author.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyTitle);
        }
        if self.author.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ValidationError::EmptyAuthor);
        }
        Ok(())
    }

    /// Captures an inverse patch for all fields present in `self`.
    pub fn capture_inverse_for(&self, book: &Book) -> Self {
        Self {
            title: self.title.as_ref().map(|_| book.title.clone()),
            author: self.author.as_ref().map(|_| book.author.clone()),
            genre: self.genre.map(|_| book.genre),
            available: self.available.map(|_| book.available),
        }
    }

    /// Applies this patch in place to `book`.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(v) = &self.title {
            book.title = v.clone();
        }
        if let Some(v) = &self.author {
            book.author = v.clone();
        }
        if let Some(v) = self.genre {
            book.genre = v;
        }
        if let Some(v) = self.available {
            book.available = v;
        }
    }
}

/// Reasons a form submission is refused before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Title is empty after trimming.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Author is empty after trimming.
    #[error("author must not be empty")]
    EmptyAuthor,
    /// No genre was selected.
    #[error("a genre must be selected")]
    MissingGenre,
    /// Genre text is not in the closed set.
    #[error("unknown genre: {0}")]
    UnknownGenre(String),
}

/// Raw add/edit form contents as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookForm {
    /// Title field.
    pub title: String,
    /// Author field.
    pub author: String,
    /// Genre selection; empty means nothing selected.
    pub genre: String,
    /// Availability checkbox.
    pub available: bool,
}

impl Default for BookForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            genre: String::new(),
            available: true,
        }
    }
}

impl BookForm {
    /// Pre-fills the form from an existing book for editing.
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.label().to_string(),
            available: book.available,
        }
    }

    /// Validates and converts the form into a draft.
    pub fn validate(&self) -> Result<BookDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let author = self.author.trim();
        if author.is_empty() {
            return Err(ValidationError::EmptyAuthor);
        }
        if self.genre.trim().is_empty() {
            return Err(ValidationError::MissingGenre);
        }
        let genre = self
            .genre
            .parse::<Genre>()
            .map_err(|e| ValidationError::UnknownGenre(e.0))?;

        Ok(BookDraft::new(title, author, genre).with_available(self.available))
    }

    /// Validates and converts the form into a full-field patch.
    pub fn validate_patch(&self) -> Result<BookPatch, ValidationError> {
        let draft = self.validate()?;
        Ok(BookPatch {
            title: Some(draft.title),
            author: Some(draft.author),
            genre: Some(draft.genre),
            available: Some(draft.available),
        })
    }
}
