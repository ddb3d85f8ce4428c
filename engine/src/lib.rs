//! Core engine for Alchemist - element catalog, discoveries and combination.
//!
//! This crate holds the shared game state without any UI dependencies.
//!
//! # Architecture
//!
//! - [`Catalog`] - Every element known to this process, partitioned by
//!   language. Readers get `Arc` snapshots; writers copy on write.
//! - [`DiscoveryLedger`] - Per-language, insertion-ordered discoveries,
//!   autosaved to `discoveries.json`.
//! - [`Store`] - Catalog, ledger, fallback policy and status behind one `Arc`.
//! - [`Orchestrator`] - The only caller of the oracle and the only writer of
//!   oracle results into the store.
//!
//! Language and player travel as an explicit [`SessionContext`] rather than
//! living in globals.

mod catalog;
mod fallback;
mod ledger;
mod library;
mod orchestrator;
mod session;
mod status;
mod store;

pub use catalog::{Catalog, CatalogPartition};
pub use fallback::FallbackPolicy;
pub use ledger::{DiscoveryLedger, LEDGER_FILE_NAME, LedgerError};
pub use library::{LibraryQuery, LibrarySort, LibrarySortParseError};
pub use orchestrator::{MAX_CATALOG_PAGES, Orchestrator};
pub use session::SessionContext;
pub use status::{StoreStatus, StoreWarning, WarningKind};
pub use store::Store;

pub use alchemist_oracle::{self, HttpOracle, Oracle, OracleError, OracleSettings};
pub use alchemist_types::{
    CombinationResult, Element, ElementId, Language, PlayerName, ResultOrigin,
};
