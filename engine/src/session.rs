use alchemist_types::{Language, PlayerName};

/// The session values every operation consults: active language and player.
///
/// Passed explicitly into each call. Switching language produces a new
/// context; other languages' catalog and ledger partitions are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionContext {
    language: Language,
    player: PlayerName,
}

impl SessionContext {
    #[must_use]
    pub fn new(language: Language, player: PlayerName) -> Self {
        Self { language, player }
    }

    #[must_use]
    pub fn anonymous(language: Language) -> Self {
        Self::new(language, PlayerName::anonymous())
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub fn player(&self) -> &PlayerName {
        &self.player
    }

    #[must_use]
    pub fn with_language(&self, language: Language) -> Self {
        Self {
            language,
            player: self.player.clone(),
        }
    }

    #[must_use]
    pub fn with_player(&self, player: PlayerName) -> Self {
        Self {
            language: self.language.clone(),
            player,
        }
    }
}
