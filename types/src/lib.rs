//! Core domain types for Alchemist.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod combination;
mod element;
mod geometry;
mod ids;
mod sanitize;

pub use combination::{CombinationResult, ResultOrigin};
pub use element::Element;
pub use geometry::{Bounds, Offset, Position, Rect, Size};
pub use ids::{ElementId, InstanceId, PairId};
pub use sanitize::sanitize_display_text;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Session Value Types
// ============================================================================

/// An ISO-like short language code (`en`, `ru`, `pt-br`).
///
/// Codes are normalized to lowercase. Each language owns an independent catalog
/// partition and discovery ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

#[derive(Debug, Error)]
#[error("invalid language code {0:?}: expected 2-8 ASCII letters, optionally with '-' subtags")]
pub struct LanguageParseError(String);

impl Language {
    pub const DEFAULT_CODE: &'static str = "en";

    pub fn parse(raw: &str) -> Result<Self, LanguageParseError> {
        let code = raw.trim().to_ascii_lowercase();
        let valid_len = (2..=8).contains(&code.len());
        let valid_chars = code
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphabetic()));
        if valid_len && valid_chars {
            Ok(Self(code))
        } else {
            Err(LanguageParseError(raw.to_string()))
        }
    }

    #[must_use]
    pub fn english() -> Self {
        Self(Self::DEFAULT_CODE.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Language {
    type Error = LanguageParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}

/// The player's display name. May be empty (anonymous play).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self(sanitize_display_text(&name).into_owned())
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// The name as sent to the oracle: `None` when anonymous.
    #[must_use]
    pub fn as_option(&self) -> Option<&str> {
        if self.0.is_empty() { None } else { Some(&self.0) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<PlayerName> for String {
    fn from(value: PlayerName) -> Self {
        value.0
    }
}
