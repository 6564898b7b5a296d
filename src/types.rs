//! Shared primitive IDs and catalog enums.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Stable book identifier. Server ids are numeric but travel as strings.
pub type BookId = String;
/// Monotonic catalog change sequence number.
pub type ChangeSeq = u64;
/// Monotonic search request sequence number.
pub type SearchSeq = u64;
/// Ticket identifying one optimistic mutation.
pub type Ticket = u64;

/// Closed set of genres a book can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    /// General fiction.
    Fiction,
    /// Non-fiction.
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    /// Science fiction.
    #[serde(rename = "Science Fiction")]
    ScienceFiction,
    /// Mystery and crime.
    Mystery,
    /// Romance.
    Romance,
}

impl Genre {
    /// Every genre, in the order the selection list shows them.
    pub const ALL: [Genre; 5] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::ScienceFiction,
        Genre::Mystery,
        Genre::Romance,
    ];

    /// Display label, identical to the wire representation.
    pub fn label(self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a string is not one of [`Genre::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGenre(pub String);

impl FromStr for Genre {
    type Err = UnknownGenre;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Genre::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGenre(s.to_string()))
    }
}
