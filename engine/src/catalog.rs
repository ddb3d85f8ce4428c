//! Language-partitioned element catalog.
//!
//! Each language owns an immutable [`CatalogPartition`] behind an `Arc`.
//! Writers build a new partition (or copy-on-write the current one) and swap
//! it in under the lock, so a reader holding a snapshot never observes a
//! half-replaced partition.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use alchemist_types::{Element, ElementId, Language};

#[derive(Debug, Clone, Default)]
pub struct CatalogPartition {
    elements: HashMap<ElementId, Element>,
}

impl CatalogPartition {
    #[must_use]
    pub fn from_elements(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().map(|e| (e.id(), e)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Basic elements, ordered by id.
    #[must_use]
    pub fn basics(&self) -> Vec<Element> {
        let mut basics: Vec<Element> = self
            .elements
            .values()
            .filter(|e| e.is_basic())
            .cloned()
            .collect();
        basics.sort_by_key(Element::id);
        basics
    }

    /// All elements, ordered by id.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Element> {
        let mut all: Vec<Element> = self.elements.values().cloned().collect();
        all.sort_by_key(Element::id);
        all
    }

    fn insert(&mut self, element: Element) {
        self.elements.insert(element.id(), element);
    }
}

/// Process-wide table of every element known to the client.
#[derive(Debug, Default)]
pub struct Catalog {
    partitions: RwLock<HashMap<Language, Arc<CatalogPartition>>>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current partition for `language`. Empty if never populated.
    #[must_use]
    pub fn snapshot(&self, language: &Language) -> Arc<CatalogPartition> {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn lookup(&self, language: &Language, id: ElementId) -> Option<Element> {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .and_then(|partition| partition.get(id).cloned())
    }

    #[must_use]
    pub fn contains(&self, language: &Language, id: ElementId) -> bool {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(language)
            .is_some_and(|partition| partition.contains(id))
    }

    pub fn upsert(&self, language: &Language, element: Element) {
        let mut partitions = self
            .partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let partition = partitions.entry(language.clone()).or_default();
        Arc::make_mut(partition).insert(element);
    }

    /// Insert only the elements not already present. Returns how many were added.
    pub fn insert_missing(
        &self,
        language: &Language,
        elements: impl IntoIterator<Item = Element>,
    ) -> usize {
        let mut partitions = self
            .partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let partition = partitions.entry(language.clone()).or_default();
        let missing: Vec<Element> = elements
            .into_iter()
            .filter(|e| !partition.contains(e.id()))
            .collect();
        let added = missing.len();
        if added > 0 {
            let partition = Arc::make_mut(partition);
            for element in missing {
                partition.insert(element);
            }
        }
        added
    }

    /// Replace the partition for `language` wholesale.
    ///
    /// Elements in `retained` that the new set lacks are carried over, so
    /// ids referenced by the discovery ledger stay resolvable.
    pub fn replace_partition(
        &self,
        language: &Language,
        elements: impl IntoIterator<Item = Element>,
        retained: impl IntoIterator<Item = Element>,
    ) -> usize {
        let mut partition = CatalogPartition::from_elements(elements);
        for element in retained {
            if !partition.contains(element.id()) {
                partition.insert(element);
            }
        }
        let len = partition.len();

        self.partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(language.clone(), Arc::new(partition));
        len
    }

    #[must_use]
    pub fn basics(&self, language: &Language) -> Vec<Element> {
        self.snapshot(language).basics()
    }

    #[must_use]
    pub fn len(&self, language: &Language) -> usize {
        self.snapshot(language).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> Language {
        Language::english()
    }

    fn ru() -> Language {
        Language::parse("ru").unwrap()
    }

    fn water() -> Element {
        Element::basic(ElementId::new(1), "Water", "💧")
    }

    fn fire() -> Element {
        Element::basic(ElementId::new(2), "Fire", "🔥")
    }

    fn steam() -> Element {
        Element::new(ElementId::new(9), "Steam")
    }

    #[test]
    fn lookup_missing_partition_is_absent() {
        let catalog = Catalog::new();
        assert!(catalog.lookup(&en(), ElementId::new(1)).is_none());
        assert_eq!(catalog.len(&en()), 0);
    }

    #[test]
    fn upsert_then_lookup() {
        let catalog = Catalog::new();
        catalog.upsert(&en(), water());
        assert_eq!(catalog.lookup(&en(), ElementId::new(1)), Some(water()));
        assert!(catalog.lookup(&ru(), ElementId::new(1)).is_none());
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let catalog = Catalog::new();
        catalog.upsert(&en(), steam());
        catalog.upsert(&en(), steam().with_emoji("♨️"));
        assert_eq!(catalog.len(&en()), 1);
        assert_eq!(
            catalog.lookup(&en(), ElementId::new(9)).unwrap().emoji(),
            Some("♨️")
        );
    }

    #[test]
    fn snapshots_are_isolated_from_later_writes() {
        let catalog = Catalog::new();
        catalog.replace_partition(&en(), [water(), fire()], []);
        let before = catalog.snapshot(&en());

        catalog.upsert(&en(), steam());
        catalog.replace_partition(&en(), [water()], []);

        assert_eq!(before.len(), 2);
        assert!(before.contains(ElementId::new(2)));
        assert!(!before.contains(ElementId::new(9)));
        assert_eq!(catalog.len(&en()), 1);
    }

    #[test]
    fn replace_partition_keeps_retained_ids() {
        let catalog = Catalog::new();
        catalog.upsert(&en(), steam());

        let len = catalog.replace_partition(&en(), [water(), fire()], [steam(), water()]);

        assert_eq!(len, 3);
        assert!(catalog.contains(&en(), ElementId::new(9)));
    }

    #[test]
    fn replace_partition_leaves_other_languages_alone() {
        let catalog = Catalog::new();
        catalog.upsert(&ru(), Element::basic(ElementId::new(5), "Вода", "💧"));
        catalog.replace_partition(&en(), [water()], []);
        assert_eq!(catalog.len(&ru()), 1);
        assert_eq!(catalog.len(&en()), 1);
    }

    #[test]
    fn basics_filters_and_sorts() {
        let catalog = Catalog::new();
        catalog.replace_partition(&en(), [steam(), fire(), water()], []);
        let ids: Vec<i64> = catalog
            .basics(&en())
            .iter()
            .map(|e| e.id().value())
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn insert_missing_does_not_overwrite() {
        let catalog = Catalog::new();
        catalog.upsert(&en(), water().with_description("wet"));
        let added = catalog.insert_missing(&en(), [water(), fire()]);
        assert_eq!(added, 1);
        assert_eq!(
            catalog.lookup(&en(), ElementId::new(1)).unwrap().description(),
            Some("wet")
        );
    }
}
