//! Configuration for Alchemist.
//!
//! Read from `~/.alchemist/config.toml`. Every section and every key is
//! optional; accessors on [`AlchemistConfig`] fold in defaults so callers never
//! see a half-configured value.
//!
//! ```toml
//! [oracle]
//! base_url = "${ALCHEMIST_HOST}/api"
//! request_timeout_secs = 30
//!
//! [session]
//! language = "ru"
//! player_name = "Ada"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use alchemist_utils::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, PersistMode, atomic_write_with_options,
};
use serde::Deserialize;
use thiserror::Error;

/// Overrides `oracle.base_url` when set and non-empty.
pub const ORACLE_URL_ENV: &str = "ALCHEMIST_ORACLE_URL";

pub const DEFAULT_ORACLE_URL: &str = "http://localhost:8000/api";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_READ_RETRIES: u32 = 2;
const DEFAULT_PAGE_SIZE: u32 = 100;

const DEFAULT_SURFACE_WIDTH: f32 = 1200.0;
const DEFAULT_SURFACE_HEIGHT: f32 = 800.0;
const DEFAULT_ELEMENT_SIZE: f32 = 64.0;
const DEFAULT_DISPLAY_INTERVAL_MS: u64 = 3000;
const DEFAULT_DUPLICATE_OFFSET: f32 = 24.0;
const DEFAULT_COMMAND_CAPACITY: usize = 64;

const APP_DIR: &str = ".alchemist";

#[derive(Debug, Default, Deserialize)]
pub struct AlchemistConfig {
    pub oracle: Option<OracleConfig>,
    pub session: Option<SessionConfig>,
    pub workbench: Option<WorkbenchConfig>,
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OracleConfig {
    /// Supports `${ENV_VAR}` expansion.
    pub base_url: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_read_retries: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    pub language: Option<String>,
    pub player_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkbenchConfig {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub element_size: Option<f32>,
    pub display_interval_ms: Option<u64>,
    pub duplicate_offset: Option<f32>,
    pub command_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub persist_placeholders: bool,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn positive_f32(value: Option<f32>, default: f32) -> f32 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(default)
}

impl AlchemistConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    // ------------------------------------------------------------------------
    // [oracle]
    // ------------------------------------------------------------------------

    /// Base URL: `ALCHEMIST_ORACLE_URL`, then the config file, then the default.
    #[must_use]
    pub fn oracle_base_url(&self) -> String {
        self.oracle_base_url_with(env::var(ORACLE_URL_ENV).ok())
    }

    fn oracle_base_url_with(&self, env_override: Option<String>) -> String {
        if let Some(url) = env_override.filter(|url| !url.trim().is_empty()) {
            return url.trim().to_string();
        }
        self.oracle
            .as_ref()
            .and_then(|oracle| oracle.base_url.as_deref())
            .map(expand_env_vars)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ORACLE_URL.to_string())
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        let secs = self
            .oracle
            .as_ref()
            .and_then(|oracle| oracle.connect_timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .oracle
            .as_ref()
            .and_then(|oracle| oracle.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    #[must_use]
    pub fn max_read_retries(&self) -> u32 {
        self.oracle
            .as_ref()
            .and_then(|oracle| oracle.max_read_retries)
            .unwrap_or(DEFAULT_MAX_READ_RETRIES)
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.oracle
            .as_ref()
            .and_then(|oracle| oracle.page_size)
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    // ------------------------------------------------------------------------
    // [session]
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|session| session.language.as_deref())
    }

    #[must_use]
    pub fn player_name(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|session| session.player_name.as_deref())
    }

    // ------------------------------------------------------------------------
    // [workbench]
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn surface_size(&self) -> (f32, f32) {
        let workbench = self.workbench.as_ref();
        (
            positive_f32(workbench.and_then(|w| w.width), DEFAULT_SURFACE_WIDTH),
            positive_f32(workbench.and_then(|w| w.height), DEFAULT_SURFACE_HEIGHT),
        )
    }

    #[must_use]
    pub fn element_size(&self) -> f32 {
        positive_f32(
            self.workbench.as_ref().and_then(|w| w.element_size),
            DEFAULT_ELEMENT_SIZE,
        )
    }

    #[must_use]
    pub fn display_interval(&self) -> Duration {
        let ms = self
            .workbench
            .as_ref()
            .and_then(|w| w.display_interval_ms)
            .unwrap_or(DEFAULT_DISPLAY_INTERVAL_MS);
        Duration::from_millis(ms)
    }

    #[must_use]
    pub fn duplicate_offset(&self) -> f32 {
        self.workbench
            .as_ref()
            .and_then(|w| w.duplicate_offset)
            .filter(|offset| offset.is_finite())
            .unwrap_or(DEFAULT_DUPLICATE_OFFSET)
    }

    #[must_use]
    pub fn command_capacity(&self) -> usize {
        self.workbench
            .as_ref()
            .and_then(|w| w.command_capacity)
            .filter(|capacity| *capacity > 0)
            .unwrap_or(DEFAULT_COMMAND_CAPACITY)
    }

    // ------------------------------------------------------------------------
    // [storage]
    // ------------------------------------------------------------------------

    /// Directory holding the discovery ledger. `None` only when no home
    /// directory can be determined and none is configured.
    #[must_use]
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage
            .as_ref()
            .and_then(|storage| storage.data_dir.clone())
            .or_else(app_dir)
    }

    #[must_use]
    pub fn persist_placeholders(&self) -> bool {
        self.storage
            .as_ref()
            .is_some_and(|storage| storage.persist_placeholders)
    }
}

/// A session preference written back by [`persist_session_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    Language,
    PlayerName,
}

impl SessionKey {
    const fn as_str(self) -> &'static str {
        match self {
            SessionKey::Language => "language",
            SessionKey::PlayerName => "player_name",
        }
    }
}

/// Persist one `[session]` value to the default config file.
pub fn persist_session_value(key: SessionKey, value: &str) -> io::Result<()> {
    let Some(path) = config_path() else {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine config path",
        ));
    };
    persist_session_value_at(&path, key, value)
}

/// Persist one `[session]` value into the config file at `path`.
///
/// Uses `toml_edit` to preserve comments and formatting. Creates the file and
/// parent directory if they don't exist.
pub fn persist_session_value_at(path: &Path, key: SessionKey, value: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = if path.exists() {
        fs::read_to_string(path)?
    } else {
        String::new()
    };

    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if !doc.contains_key("session") {
        doc["session"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["session"][key.as_str()] = toml_edit::value(value);

    let serialized = doc.to_string();
    atomic_write_with_options(
        path,
        serialized.as_bytes(),
        AtomicWriteOptions {
            file_sync: FileSyncPolicy::SyncAll,
            parent_dir_sync: ParentDirSyncPolicy::SyncBestEffort,
            mode: PersistMode::OwnerOnly,
        },
    )?;

    tracing::debug!(path = %path.display(), key = key.as_str(), "Persisted session preference");
    Ok(())
}

fn app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR))
}

pub fn config_path() -> Option<PathBuf> {
    app_dir().map(|dir| dir.join("config.toml"))
}
