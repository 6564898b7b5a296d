use hashbrown::HashMap;

use crate::{
    book::Book,
    types::{BookId, Genre},
};

/// Search-term and genre criteria for the rendered list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Case-insensitive title substring; empty matches everything.
    pub search_term: String,
    /// Exact genre, or `None` for all genres.
    pub genre: Option<Genre>,
}

impl CatalogFilter {
    /// Filter matching every book.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on a title substring.
    pub fn term(search_term: impl Into<String>) -> Self {
        Self {
            search_term: search_term.into(),
            genre: None,
        }
    }

    /// Restricts the filter to one genre.
    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = Some(genre);
        self
    }

    /// Returns true when `book` satisfies both criteria.
    pub fn matches(&self, book: &Book) -> bool {
        Criteria::from(self).matches(book)
    }
}

#[derive(Debug, Clone)]
struct Criteria {
    needle: String,
    genre: Option<Genre>,
}

impl From<&CatalogFilter> for Criteria {
    fn from(f: &CatalogFilter) -> Self {
        Self {
            needle: f.search_term.to_lowercase(),
            genre: f.genre,
        }
    }
}

impl Criteria {
    fn matches(&self, book: &Book) -> bool {
        let genre_ok = self.genre.is_none_or(|g| g == book.genre);
        genre_ok && (self.needle.is_empty() || book.title.to_lowercase().contains(&self.needle))
    }
}

/// Matching books in catalog order.
///
/// Borrows the store, so the catalog cannot change underneath it. Cloning
/// (or [`Matches::restart`]) yields a fresh pass over the same criteria.
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    order: &'a [BookId],
    records: &'a HashMap<BookId, Book>,
    criteria: Criteria,
    cursor: usize,
}

impl<'a> Matches<'a> {
    pub(crate) fn new(
        order: &'a [BookId],
        records: &'a HashMap<BookId, Book>,
        filter: &CatalogFilter,
    ) -> Self {
        Self {
            order,
            records,
            criteria: Criteria::from(filter),
            cursor: 0,
        }
    }

    /// Rewinds to the start of the catalog.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = &'a Book;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.order.get(self.cursor) {
            self.cursor += 1;
            if let Some(book) = self.records.get(id) {
                if self.criteria.matches(book) {
                    return Some(book);
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.order.len().saturating_sub(self.cursor)))
    }
}

impl std::iter::FusedIterator for Matches<'_> {}
