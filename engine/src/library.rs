//! Search and ordering over a player's discoveries.

use std::cmp::Ordering;
use std::str::FromStr;

use alchemist_types::Element;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibrarySort {
    /// Case-insensitive by name.
    #[default]
    Alphabetical,
    /// Most recently created first.
    Newest,
    Oldest,
}

#[derive(Debug, Error)]
#[error("unknown sort order {0:?}: expected name, newest or oldest")]
pub struct LibrarySortParseError(String);

impl FromStr for LibrarySort {
    type Err = LibrarySortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" | "alphabetical" | "az" => Ok(Self::Alphabetical),
            "newest" | "new" => Ok(Self::Newest),
            "oldest" | "old" => Ok(Self::Oldest),
            _ => Err(LibrarySortParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LibraryQuery {
    search: Option<String>,
    sort: LibrarySort,
}

impl LibraryQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep elements whose name contains `term`, ignoring case. Blank terms
    /// match everything.
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term: String = term.into();
        let term = term.trim().to_lowercase();
        self.search = (!term.is_empty()).then_some(term);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: LibrarySort) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn apply(&self, elements: Vec<Element>) -> Vec<Element> {
        let mut matched: Vec<Element> = match &self.search {
            Some(term) => elements
                .into_iter()
                .filter(|e| e.name().to_lowercase().contains(term.as_str()))
                .collect(),
            None => elements,
        };
        matched.sort_by(|a, b| compare(self.sort, a, b));
        matched
    }
}

fn compare(sort: LibrarySort, a: &Element, b: &Element) -> Ordering {
    match sort {
        LibrarySort::Alphabetical => a
            .name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| a.id().cmp(&b.id())),
        LibrarySort::Newest => b
            .created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id())),
        LibrarySort::Oldest => a
            .created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id())),
    }
}
