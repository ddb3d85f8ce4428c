use alchemist_types::{CombinationResult, Element, ElementId, InstanceId, PairId};

/// What changed during one `tick`, for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkbenchNotice {
    /// A queued `SurfaceCommand::Add` was applied.
    Added {
        instance: InstanceId,
        element_id: ElementId,
    },
    Cleared,
    /// A pair produced an element (from the oracle or the local fallback).
    /// Both sources are gone; the result appears after the display interval.
    Combined {
        pair: PairId,
        result: CombinationResult,
    },
    /// The oracle declined the pair. Both sources are back to `Placed`.
    Declined { pair: PairId, error: String },
    /// A combination finished after its sources were cleared. Catalog and
    /// ledger were still updated; nothing is placed.
    Skipped {
        pair: PairId,
        result: CombinationResult,
    },
    /// A combination result became an instance at its anchor.
    Materialized {
        pair: PairId,
        instance: InstanceId,
    },
    /// A targeted fetch replaced placeholder snapshots.
    Resolved { element: Element, instances: usize },
    /// A targeted fetch failed; affected instances keep the placeholder.
    Unresolved { element_id: ElementId },
}

impl WorkbenchNotice {
    /// The new discovery this notice announces, if any.
    #[must_use]
    pub fn discovery(&self) -> Option<&Element> {
        match self {
            Self::Combined { result, .. } | Self::Skipped { result, .. }
                if result.is_new_discovery && !result.is_fallback() =>
            {
                result.element()
            }
            _ => None,
        }
    }
}
