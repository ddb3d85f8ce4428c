//! Shared catalog, ledger and status behind one handle.

use std::sync::{Mutex, MutexGuard, PoisonError};

use alchemist_types::{Element, ElementId, Language};

use crate::catalog::Catalog;
use crate::fallback::FallbackPolicy;
use crate::ledger::DiscoveryLedger;
use crate::library::LibraryQuery;
use crate::status::{StoreStatus, WarningKind};

/// Process-wide shared state: catalog, ledger, fallback policy and status.
///
/// Reads are open to every surface. Writes go through the orchestrator, plus
/// the session-level [`Store::seed_basics`] and [`Store::reset`].
#[derive(Debug, Default)]
pub struct Store {
    catalog: Catalog,
    ledger: DiscoveryLedger,
    fallback: FallbackPolicy,
    status: StoreStatus,
    // Serializes catalog+ledger writes that must land together.
    writes: Mutex<()>,
}

impl Store {
    #[must_use]
    pub fn new(ledger: DiscoveryLedger, fallback: FallbackPolicy) -> Self {
        Self {
            catalog: Catalog::new(),
            ledger,
            fallback,
            status: StoreStatus::default(),
            writes: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn ledger(&self) -> &DiscoveryLedger {
        &self.ledger
    }

    #[must_use]
    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    #[must_use]
    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    #[must_use]
    pub fn lookup(&self, language: &Language, id: ElementId) -> Option<Element> {
        self.catalog.lookup(language, id)
    }

    /// Basic elements for `language`: the catalog's, or the built-in seed
    /// when the catalog has none.
    #[must_use]
    pub fn basics(&self, language: &Language) -> Vec<Element> {
        let basics = self.catalog.basics(language);
        if basics.is_empty() {
            self.fallback.seed(language)
        } else {
            basics
        }
    }

    /// Seed the ledger for `language` if it is empty. Returns how many
    /// elements were added.
    ///
    /// Also makes every ledger entry resolvable through the catalog, which
    /// matters for a ledger loaded from disk before any catalog fetch.
    pub fn seed_basics(&self, language: &Language) -> usize {
        let _writes = self.lock_writes();
        let basics = self.basics(language);
        self.catalog.insert_missing(language, basics.iter().cloned());
        let added = self.ledger.seed(language, &basics);
        self.catalog
            .insert_missing(language, self.ledger.list(language));
        self.surface_save_error();
        if added > 0 {
            tracing::info!(%language, added, "Seeded discovery ledger with basic elements");
        }
        added
    }

    /// Record a discovery: upsert into the catalog first, then the ledger.
    /// Returns whether it was new to the ledger.
    pub fn record(&self, language: &Language, element: Element) -> bool {
        let _writes = self.lock_writes();
        self.catalog.upsert(language, element.clone());
        let is_new = self.ledger.record(language, element);
        self.surface_save_error();
        is_new
    }

    /// Empty the ledger for `language` and re-seed its basics.
    pub fn reset(&self, language: &Language) {
        let _writes = self.lock_writes();
        let basics = self.basics(language);
        self.catalog.insert_missing(language, basics.iter().cloned());
        self.ledger.reset(language, &basics);
        self.surface_save_error();
        tracing::info!(%language, basics = basics.len(), "Reset discovery ledger");
    }

    /// Swap in a freshly fetched catalog partition for `language`.
    ///
    /// Ledger entries the fetched set lacks are carried over. The ledger is
    /// read inside the same critical section as the swap, so a discovery
    /// recorded while the listing was in flight is never dropped. Returns the
    /// new partition size.
    pub fn replace_catalog(&self, language: &Language, elements: Vec<Element>) -> usize {
        let _writes = self.lock_writes();
        self.catalog
            .replace_partition(language, elements, self.ledger.list(language))
    }

    /// Keep the current partition and merge in the built-in seed plus every
    /// ledger entry. Used when the catalog cannot be fetched.
    pub fn restore_offline_catalog(&self, language: &Language) -> usize {
        let _writes = self.lock_writes();
        self.catalog
            .insert_missing(language, self.fallback.seed(language))
            + self
                .catalog
                .insert_missing(language, self.ledger.list(language))
    }

    #[must_use]
    pub fn discoveries(&self, language: &Language) -> Vec<Element> {
        self.ledger.list(language)
    }

    #[must_use]
    pub fn library(&self, language: &Language, query: &LibraryQuery) -> Vec<Element> {
        query.apply(self.ledger.list(language))
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn surface_save_error(&self) {
        if let Some(error) = self.ledger.take_save_error() {
            self.status.warn(WarningKind::Persistence, error);
        }
    }
}
