use crate::{Element, ElementId};

/// Where a [`CombinationResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// The remote oracle answered.
    Oracle,
    /// The oracle was unreachable or an input could not be resolved; the result
    /// was synthesized locally.
    Fallback,
}

/// Outcome of combining two elements.
///
/// `result` is `None` only alongside an `error` descriptor: the oracle declined
/// the pair (a semantic failure) and nothing was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationResult {
    pub element1_id: ElementId,
    pub element2_id: ElementId,
    pub result: Option<Element>,
    /// The result was not previously in this player's ledger.
    pub is_new_discovery: bool,
    /// The result was never produced by any player, as reported by the oracle.
    /// Not verifiable locally.
    pub is_first_discovery: bool,
    pub error: Option<String>,
    pub origin: ResultOrigin,
}

impl CombinationResult {
    /// A semantic failure: the oracle answered but produced nothing.
    #[must_use]
    pub fn declined(element1_id: ElementId, element2_id: ElementId, error: impl Into<String>) -> Self {
        Self {
            element1_id,
            element2_id,
            result: None,
            is_new_discovery: false,
            is_first_discovery: false,
            error: Some(error.into()),
            origin: ResultOrigin::Oracle,
        }
    }

    /// The produced element, when the combination succeeded.
    #[must_use]
    pub fn element(&self) -> Option<&Element> {
        if self.error.is_some() {
            return None;
        }
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_declined(&self) -> bool {
        self.element().is_none()
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, ResultOrigin::Fallback)
    }
}
