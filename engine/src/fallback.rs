//! Offline behavior in one place.
//!
//! Used by the catalog fetch (built-in seed set) and by combine (placeholder
//! result) whenever the oracle cannot be reached.

use alchemist_types::{CombinationResult, Element, ElementId, Language, ResultOrigin};

struct SeedElement {
    id: i64,
    name: &'static str,
    emoji: &'static str,
    description: &'static str,
}

/// Ids match the server's initial database so seeded ledgers line up with the
/// real catalog once the oracle is reachable again.
const SEED_EN: &[SeedElement] = &[
    SeedElement {
        id: 1,
        name: "Water",
        emoji: "💧",
        description: "A clear, colorless liquid essential for life.",
    },
    SeedElement {
        id: 2,
        name: "Fire",
        emoji: "🔥",
        description: "The rapid oxidation of material producing heat and light.",
    },
    SeedElement {
        id: 3,
        name: "Earth",
        emoji: "🌍",
        description: "The solid ground beneath us and the material that forms it.",
    },
    SeedElement {
        id: 4,
        name: "Air",
        emoji: "💨",
        description: "The invisible mixture of gases that surrounds the planet.",
    },
];

const SEED_RU: &[SeedElement] = &[
    SeedElement {
        id: 5,
        name: "Вода",
        emoji: "💧",
        description: "Прозрачная жидкость, необходимая для жизни.",
    },
    SeedElement {
        id: 6,
        name: "Огонь",
        emoji: "🔥",
        description: "Быстрое окисление материала, производящее тепло и свет.",
    },
    SeedElement {
        id: 7,
        name: "Земля",
        emoji: "🌍",
        description: "Твёрдая поверхность под нами и материал, из которого она состоит.",
    },
    SeedElement {
        id: 8,
        name: "Воздух",
        emoji: "💨",
        description: "Невидимая смесь газов, окружающая планету.",
    },
];

const PLACEHOLDER_EMOJI: &str = "❓";

#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    persist_placeholders: bool,
}

impl FallbackPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record placeholder results in the ledger instead of keeping them local
    /// to the workbench.
    #[must_use]
    pub fn with_persist_placeholders(mut self, persist: bool) -> Self {
        self.persist_placeholders = persist;
        self
    }

    #[must_use]
    pub fn persist_placeholders(&self) -> bool {
        self.persist_placeholders
    }

    /// The built-in basic elements for `language`. Languages without a
    /// dedicated seed get the English one.
    #[must_use]
    pub fn seed(&self, language: &Language) -> Vec<Element> {
        let table = match language.as_str() {
            "ru" => SEED_RU,
            _ => SEED_EN,
        };
        table
            .iter()
            .map(|seed| {
                Element::basic(ElementId::new(seed.id), seed.name, seed.emoji)
                    .with_description(seed.description)
            })
            .collect()
    }

    /// The single well-known stand-in element.
    #[must_use]
    pub fn placeholder_element(&self, language: &Language) -> Element {
        let name = match language.as_str() {
            "ru" => "Неизвестно",
            _ => "Unknown",
        };
        Element::new(ElementId::UNRESOLVED, name).with_emoji(PLACEHOLDER_EMOJI)
    }

    /// Deterministic result used when the oracle could not be asked.
    #[must_use]
    pub fn placeholder_result(
        &self,
        element1_id: ElementId,
        element2_id: ElementId,
        language: &Language,
    ) -> CombinationResult {
        CombinationResult {
            element1_id,
            element2_id,
            result: Some(self.placeholder_element(language)),
            is_new_discovery: true,
            is_first_discovery: false,
            error: None,
            origin: ResultOrigin::Fallback,
        }
    }
}
