//! Shared infrastructure utilities for Alchemist.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename), used by the
//!   discovery ledger and by session preference write-back.

pub mod atomic_write;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, PersistMode, atomic_write,
    atomic_write_with_options, recover_bak_file,
};
