use alchemist_types::{Element, ElementId, InstanceId, PairId, Position};

/// Lifecycle of one instance: `Placed → Paired → {consumed | Placed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Placed,
    /// Waiting on a combination. Paired instances are never paired again.
    Paired(PairId),
}

/// Whether the element snapshot is real or a stand-in awaiting a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    /// The catalog did not know `requested` at placement time; a targeted
    /// fetch is in flight or has failed.
    Awaiting(ElementId),
}

#[derive(Debug, Clone)]
pub struct Instance {
    id: InstanceId,
    element: Element,
    position: Position,
    state: InstanceState,
    resolution: Resolution,
}

impl Instance {
    pub(crate) fn new(id: InstanceId, element: Element, position: Position) -> Self {
        Self {
            id,
            element,
            position,
            state: InstanceState::Placed,
            resolution: Resolution::Resolved,
        }
    }

    pub(crate) fn awaiting(
        id: InstanceId,
        requested: ElementId,
        placeholder: Element,
        position: Position,
    ) -> Self {
        Self {
            resolution: Resolution::Awaiting(requested),
            ..Self::new(id, placeholder, position)
        }
    }

    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// The id sent to the oracle when this instance is paired: the requested
    /// id while awaiting resolution, otherwise the snapshot's.
    #[must_use]
    pub fn element_id(&self) -> ElementId {
        match self.resolution {
            Resolution::Awaiting(requested) => requested,
            Resolution::Resolved => self.element.id(),
        }
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub fn state(&self) -> InstanceState {
        self.state
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[must_use]
    pub fn is_placed(&self) -> bool {
        matches!(self.state, InstanceState::Placed)
    }

    #[must_use]
    pub fn pair(&self) -> Option<PairId> {
        match self.state {
            InstanceState::Paired(pair) => Some(pair),
            InstanceState::Placed => None,
        }
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn pair_with(&mut self, pair: PairId) {
        self.state = InstanceState::Paired(pair);
    }

    pub(crate) fn unpair(&mut self) {
        self.state = InstanceState::Placed;
    }

    pub(crate) fn resolve(&mut self, element: Element) {
        self.element = element;
        self.resolution = Resolution::Resolved;
    }

    /// A copy at `position` with a new id. Pairing state is not copied.
    pub(crate) fn duplicate(&self, id: InstanceId, position: Position) -> Self {
        Self {
            id,
            element: self.element.clone(),
            position,
            state: InstanceState::Placed,
            resolution: self.resolution,
        }
    }
}
