//! Map session: wires filter persistence and credential resolution around
//! the fetch coordinator.
//!
//! This is the surface the UI talks to. It primes the coordinator from the
//! persisted filters on start, saves every applied filter set, and turns
//! login/logout events into role changes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::ports::{CredentialProvider, FilterStore, ParcelSource};
use crate::domain::{
    Access, AuthResolver, ExportError, ExportSerializer, FetchCoordinator, FilterCriteria,
    RequestEpoch, SyncSnapshot,
};

/// Port bundle required by a map session.
pub struct MapSessionPorts {
    /// Outbound parcel source adapter.
    pub source: Arc<dyn ParcelSource>,
    /// Session credential lookup.
    pub credentials: Arc<dyn CredentialProvider>,
    /// Filter persistence.
    pub filter_store: Arc<dyn FilterStore>,
}

impl MapSessionPorts {
    /// Build a strongly-typed port bundle.
    #[must_use]
    pub fn new(
        source: Arc<dyn ParcelSource>,
        credentials: Arc<dyn CredentialProvider>,
        filter_store: Arc<dyn FilterStore>,
    ) -> Self {
        Self {
            source,
            credentials,
            filter_store,
        }
    }
}

/// One user's view of the parcel map.
pub struct MapSession {
    coordinator: FetchCoordinator,
    auth: AuthResolver,
    filter_store: Arc<dyn FilterStore>,
    filters_key: String,
}

impl MapSession {
    /// Build a session persisting filters under `filters_key`.
    #[must_use]
    pub fn new(ports: MapSessionPorts, filters_key: impl Into<String>) -> Self {
        Self {
            coordinator: FetchCoordinator::new(ports.source),
            auth: AuthResolver::new(ports.credentials),
            filter_store: ports.filter_store,
            filters_key: filters_key.into(),
        }
    }

    /// Resolve access, restore persisted filters, and issue the first
    /// request. Unreadable persisted filters are ignored.
    pub async fn start(&mut self) -> RequestEpoch {
        let access = self.auth.resolve().await;
        let filters = match self.filter_store.load(&self.filters_key).await {
            Ok(Some(filters)) => {
                info!(key = %self.filters_key, "restoring persisted filters");
                filters
            }
            Ok(None) => {
                debug!(key = %self.filters_key, "no persisted filters");
                FilterCriteria::default()
            }
            Err(error) => {
                warn!(key = %self.filters_key, %error, "ignoring unreadable persisted filters");
                FilterCriteria::default()
            }
        };
        self.coordinator.synchronise(filters, access)
    }

    /// Persist and apply a new filter set. A failed save is logged and does
    /// not prevent the request.
    pub async fn apply_filters(&mut self, filters: FilterCriteria) -> RequestEpoch {
        if let Err(error) = self.filter_store.save(&self.filters_key, &filters).await {
            warn!(key = %self.filters_key, %error, "failed to persist filters");
        }
        self.coordinator.apply_filters(filters)
    }

    /// Re-resolve credentials after a login or logout and re-query.
    pub async fn refresh_auth(&mut self) -> RequestEpoch {
        let access = self.auth.resolve().await;
        info!(role = %access.role(), "access refreshed");
        self.coordinator.set_role(access)
    }

    /// Drop to guest access and re-query.
    pub fn sign_out(&mut self) -> RequestEpoch {
        self.coordinator.set_role(Access::Guest)
    }

    /// Export the visible feature set as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NothingToExport`] when nothing is visible.
    pub fn export_csv(&self) -> Result<String, ExportError> {
        let snapshot = self.coordinator.snapshot();
        let Some(data) = snapshot.data else {
            return Err(ExportError::NothingToExport);
        };
        ExportSerializer::serialize(&data)
    }

    /// Wait until the latest request resolves.
    pub async fn settle(&mut self) -> SyncSnapshot {
        self.coordinator.settle().await
    }

    /// Current observable state.
    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        self.coordinator.snapshot()
    }

    /// Filters of the latest request.
    #[must_use]
    pub const fn filters(&self) -> &FilterCriteria {
        self.coordinator.filters()
    }
}
