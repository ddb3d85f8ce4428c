//! The player's discovery ledger.
//!
//! Per language, an ordered set of discovered elements keyed by id. Insertion
//! order is kept for "recently discovered" views; membership is by id only.
//!
//! When opened with a path, every mutation autosaves the whole ledger as one
//! JSON document (`{"en": [...], "ru": [...]}`) through an atomic write. A
//! failed save never fails the mutation: the error is logged and kept for the
//! store to surface as a warning.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::{fs, io};

use alchemist_types::{Element, ElementId, Language};
use alchemist_utils::{atomic_write, recover_bak_file};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LEDGER_FILE_NAME: &str = "discoveries.json";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse ledger at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write ledger at {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One language's discoveries: map for lookup, vector for order.
#[derive(Debug, Default, Clone)]
struct LedgerPartition {
    order: Vec<ElementId>,
    elements: HashMap<ElementId, Element>,
}

impl LedgerPartition {
    fn insert(&mut self, element: Element) -> bool {
        let id = element.id();
        if self.elements.contains_key(&id) {
            return false;
        }
        self.order.push(id);
        self.elements.insert(id, element);
        true
    }

    fn ordered(&self) -> Vec<Element> {
        self.order
            .iter()
            .filter_map(|id| self.elements.get(id).cloned())
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.elements.clear();
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
struct LedgerDocument(BTreeMap<Language, Vec<Element>>);

#[derive(Debug, Default)]
struct LedgerState {
    partitions: HashMap<Language, LedgerPartition>,
    last_save_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct DiscoveryLedger {
    state: Mutex<LedgerState>,
    path: Option<PathBuf>,
}

impl DiscoveryLedger {
    /// A ledger that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or create on first save) the ledger file at `path`.
    ///
    /// A missing file yields an empty ledger. Duplicate ids left by a damaged
    /// file collapse to their first occurrence.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        recover_bak_file(&path);

        let partitions = match load_document(&path)? {
            Some(LedgerDocument(languages)) => languages
                .into_iter()
                .map(|(language, elements)| {
                    let mut partition = LedgerPartition::default();
                    let total = elements.len();
                    for element in elements {
                        partition.insert(element);
                    }
                    if partition.order.len() != total {
                        tracing::warn!(
                            %language,
                            dropped = total - partition.order.len(),
                            "Collapsed duplicate ledger entries"
                        );
                    }
                    (language, partition)
                })
                .collect(),
            None => HashMap::new(),
        };

        tracing::debug!(path = %path.display(), languages = partitions.len(), "Opened discovery ledger");
        Ok(Self {
            state: Mutex::new(LedgerState {
                partitions,
                last_save_error: None,
            }),
            path: Some(path),
        })
    }

    /// Open `discoveries.json` inside `data_dir`.
    pub fn open_in(data_dir: &Path) -> Result<Self, LedgerError> {
        Self::open(data_dir.join(LEDGER_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Populate `language` with `basics` if it has no entries yet.
    ///
    /// Returns the number of elements added (0 when already seeded).
    pub fn seed(&self, language: &Language, basics: &[Element]) -> usize {
        let mut state = self.lock();
        let partition = state.partitions.entry(language.clone()).or_default();
        if !partition.is_empty() {
            return 0;
        }
        let added = basics
            .iter()
            .filter(|e| partition.insert((*e).clone()))
            .count();
        if added > 0 {
            self.save_locked(&mut state);
        }
        added
    }

    /// Idempotent add. Returns whether `element` was new for `language`.
    pub fn record(&self, language: &Language, element: Element) -> bool {
        let mut state = self.lock();
        let added = state
            .partitions
            .entry(language.clone())
            .or_default()
            .insert(element);
        if added {
            self.save_locked(&mut state);
        }
        added
    }

    /// Empty `language`, then re-seed it with `basics` in the same critical
    /// section, so no reader sees the ledger without its basics.
    pub fn reset(&self, language: &Language, basics: &[Element]) {
        let mut state = self.lock();
        let partition = state.partitions.entry(language.clone()).or_default();
        partition.clear();
        for element in basics {
            partition.insert(element.clone());
        }
        self.save_locked(&mut state);
    }

    /// Every recorded element for `language`, in discovery order.
    #[must_use]
    pub fn list(&self, language: &Language) -> Vec<Element> {
        self.lock()
            .partitions
            .get(language)
            .map(LedgerPartition::ordered)
            .unwrap_or_default()
    }

    /// The `n` most recent discoveries, newest first.
    #[must_use]
    pub fn recent(&self, language: &Language, n: usize) -> Vec<Element> {
        let state = self.lock();
        let Some(partition) = state.partitions.get(language) else {
            return Vec::new();
        };
        partition
            .order
            .iter()
            .rev()
            .take(n)
            .filter_map(|id| partition.elements.get(id).cloned())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, language: &Language, id: ElementId) -> bool {
        self.lock()
            .partitions
            .get(language)
            .is_some_and(|partition| partition.elements.contains_key(&id))
    }

    #[must_use]
    pub fn len(&self, language: &Language) -> usize {
        self.lock()
            .partitions
            .get(language)
            .map_or(0, |partition| partition.order.len())
    }

    #[must_use]
    pub fn is_empty(&self, language: &Language) -> bool {
        self.len(language) == 0
    }

    /// The most recent save failure, cleared on read.
    pub fn take_save_error(&self) -> Option<String> {
        self.lock().last_save_error.take()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_locked(&self, state: &mut LedgerState) {
        let Some(path) = self.path.as_deref() else {
            return;
        };
        match save_document(path, &state.partitions) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Saved discovery ledger");
            }
            Err(e) => {
                tracing::warn!("Failed to save discovery ledger: {e}");
                state.last_save_error = Some(e.to_string());
            }
        }
    }
}

fn load_document(path: &Path) -> Result<Option<LedgerDocument>, LedgerError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LedgerError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| LedgerError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn save_document(
    path: &Path,
    partitions: &HashMap<Language, LedgerPartition>,
) -> Result<(), LedgerError> {
    let document = LedgerDocument(
        partitions
            .iter()
            .map(|(language, partition)| (language.clone(), partition.ordered()))
            .collect(),
    );
    let json = serde_json::to_vec_pretty(&document).map_err(|e| LedgerError::Write {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| LedgerError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    atomic_write(path, &json).map_err(|source| LedgerError::Write {
        path: path.to_path_buf(),
        source,
    })
}
