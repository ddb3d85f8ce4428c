//! Non-blocking status shared with every UI surface.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The catalog could not be fetched; the built-in seed is in use.
    CatalogOffline,
    /// A combine call failed; a placeholder result was produced.
    CombineOffline,
    /// An element id could not be resolved even after a targeted fetch.
    Unresolved,
    /// The discovery ledger could not be saved.
    Persistence,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningKind::CatalogOffline => "catalog offline",
            WarningKind::CombineOffline => "oracle offline",
            WarningKind::Unresolved => "unresolved element",
            WarningKind::Persistence => "save failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Default)]
pub struct StoreStatus {
    warning: Mutex<Option<StoreWarning>>,
    in_flight: AtomicUsize,
}

impl StoreStatus {
    pub fn warn(&self, kind: WarningKind, message: impl Into<String>) {
        let warning = StoreWarning {
            kind,
            message: message.into(),
        };
        tracing::warn!(kind = %warning.kind, "{}", warning.message);
        *self.warning.lock().unwrap_or_else(PoisonError::into_inner) = Some(warning);
    }

    /// The most recent warning, if any.
    #[must_use]
    pub fn warning(&self) -> Option<StoreWarning> {
        self.warning
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_warning(&self) {
        *self.warning.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of oracle calls currently outstanding.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight() > 0
    }

    pub(crate) fn begin_call(&self) -> InFlightGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard { status: self }
    }
}

/// Decrements the in-flight count when dropped, including on early return.
pub(crate) struct InFlightGuard<'a> {
    status: &'a StoreStatus,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.status.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_warning_wins_and_clears() {
        let status = StoreStatus::default();
        status.warn(WarningKind::CatalogOffline, "connection refused");
        status.warn(WarningKind::CombineOffline, "timed out");

        let warning = status.warning().unwrap();
        assert_eq!(warning.kind, WarningKind::CombineOffline);
        assert_eq!(warning.to_string(), "oracle offline: timed out");

        status.clear_warning();
        assert!(status.warning().is_none());
    }

    #[test]
    fn in_flight_guard_tracks_calls() {
        let status = StoreStatus::default();
        {
            let _a = status.begin_call();
            let _b = status.begin_call();
            assert_eq!(status.in_flight(), 2);
        }
        assert!(!status.is_busy());
    }
}
