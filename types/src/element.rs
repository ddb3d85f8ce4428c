//! The element record shared by the catalog, the ledger and the workbench.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ElementId;
use crate::sanitize::sanitize_display_text;

/// A named, iconable entity the player can combine.
///
/// Elements are immutable once constructed: the catalog replaces records
/// wholesale instead of editing them in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    id: ElementId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "flag::deserialize")]
    is_basic: bool,
    #[serde(default = "timestamp::epoch", deserialize_with = "timestamp::deserialize")]
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discovered_by: Option<String>,
}

impl Element {
    #[must_use]
    pub fn new(id: ElementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            emoji: None,
            description: None,
            is_basic: false,
            created_at: timestamp::epoch(),
            discovered_by: None,
        }
    }

    /// Construct a basic (starting) element.
    #[must_use]
    pub fn basic(id: ElementId, name: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            is_basic: true,
            emoji: Some(emoji.into()),
            ..Self::new(id, name)
        }
    }

    #[must_use]
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    #[must_use]
    pub fn with_discovered_by(mut self, player: impl Into<String>) -> Self {
        self.discovered_by = Some(player.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn emoji(&self) -> Option<&str> {
        self.emoji.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.is_basic
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn discovered_by(&self) -> Option<&str> {
        self.discovered_by.as_deref()
    }

    /// Locally synthesized stand-ins carry reserved ids.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.is_reserved()
    }

    /// Single-line label safe to print to a terminal: `"💧 Water"`.
    ///
    /// Names are generated remotely and may contain control sequences.
    #[must_use]
    pub fn label(&self) -> String {
        let name = sanitize_display_text(&self.name);
        match self.emoji.as_deref().map(sanitize_display_text) {
            Some(emoji) if !emoji.is_empty() => format!("{emoji} {name}"),
            _ => name.into_owned(),
        }
    }
}

/// `is_basic` arrives as a boolean from some endpoints and as `0`/`1` from others.
mod flag {
    use super::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Bool(value)) => value,
            Some(Raw::Int(value)) => value != 0,
            None => false,
        })
    }
}

/// Timestamps arrive either as RFC 3339 or as naive ISO strings (implicitly UTC).
mod timestamp {
    use super::{DateTime, Deserialize, Deserializer, NaiveDateTime, Utc};
    use serde::de::Error;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub(super) fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(epoch());
        };
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}
