//! Overlap detection between instances, independent of any renderer.

use alchemist_types::{Bounds, InstanceId, Position, Rect, Size};

use crate::instance::Instance;

/// Axis-aligned boxes of one fixed element size inside the surface bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialIndex {
    bounds: Bounds,
    element_size: Size,
}

impl SpatialIndex {
    #[must_use]
    pub fn new(bounds: Bounds, element_size: Size) -> Self {
        Self {
            bounds,
            element_size,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn element_size(&self) -> Size {
        self.element_size
    }

    #[must_use]
    pub fn rect_at(&self, position: Position) -> Rect {
        Rect::new(position, self.element_size)
    }

    #[must_use]
    pub fn clamp(&self, position: Position) -> Position {
        self.bounds.clamp(position, self.element_size)
    }

    #[must_use]
    pub fn overlaps(&self, a: Position, b: Position) -> bool {
        self.rect_at(a).intersects(&self.rect_at(b))
    }

    /// The topmost `Placed` instance overlapping `target`, other than `target`
    /// itself.
    ///
    /// `instances` must be in creation order; later instances draw on top.
    #[must_use]
    pub fn topmost_overlap<'a>(
        &self,
        instances: impl DoubleEndedIterator<Item = &'a Instance>,
        target: &Instance,
    ) -> Option<InstanceId> {
        let target_rect = self.rect_at(target.position());
        instances
            .rev()
            .filter(|candidate| candidate.id() != target.id() && candidate.is_placed())
            .find(|candidate| self.rect_at(candidate.position()).intersects(&target_rect))
            .map(Instance::id)
    }
}
