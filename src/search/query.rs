use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{BookId, SearchSeq};

/// Default minimum trimmed query length before a search is issued.
pub const MIN_QUERY_LEN: usize = 2;

/// What the user has typed plus the section selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Raw input text.
    pub text: String,
    /// Selected section id; `None` or empty means all sections.
    pub section: Option<String>,
}

impl SearchQuery {
    /// Query over all sections.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            section: None,
        }
    }

    /// Restricts the query to one section.
    pub fn in_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Trimmed query text.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Section id if one is actually selected.
    pub fn section_id(&self) -> Option<&str> {
        self.section.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// True when the query is too short to search and no section is selected.
    pub fn is_blank(&self, min_len: usize) -> bool {
        self.trimmed().chars().count() < min_len && self.section_id().is_none()
    }
}

/// One row of a search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Book id.
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: BookId,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Section (shelf) name.
    pub section: String,
    /// Availability.
    pub available: bool,
}

/// Hits of one search request, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    /// Sequence number of the request that produced these hits.
    pub seq: SearchSeq,
    /// Hits in server order.
    pub items: Vec<SearchHit>,
}

fn id_from_number_or_string<'de, D>(de: D) -> Result<BookId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Str(String),
    }

    Ok(match Repr::deserialize(de)? {
        Repr::Num(n) => n.to_string(),
        Repr::Str(s) => s,
    })
}
