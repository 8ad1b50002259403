//! Observable synchronisation state and request epochs.

use std::fmt;
use std::sync::Arc;

use crate::domain::FeatureCollection;

/// Monotonic token identifying one synchronisation attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestEpoch(u64);

impl RequestEpoch {
    /// Epoch before any request has been issued.
    pub const INITIAL: Self = Self(0);

    /// The epoch following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Raw counter value, for logging and diagnostics.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the current synchronisation attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been requested yet.
    #[default]
    Idle,
    /// The latest request is in flight.
    Loading,
    /// The latest request produced data.
    Success,
    /// The latest request failed.
    Failed,
    /// The latest request was aborted before resolving.
    Cancelled,
}

/// Read-only view of the coordinator published to the UI.
///
/// `data` is kept while a newer request loads and after a failure, so the
/// last good result stays visible until replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSnapshot {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Whether the latest request is still in flight.
    pub loading: bool,
    /// Last successfully projected feature set.
    pub data: Option<Arc<FeatureCollection>>,
    /// Failure description for the latest request.
    pub error: Option<String>,
    /// Epoch of the most recently issued request.
    pub epoch: RequestEpoch,
    /// Records dropped from `data` for malformed geometry.
    pub skipped_records: usize,
}

impl SyncSnapshot {
    /// Number of visible features.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.len())
    }
}
