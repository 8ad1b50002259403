//! Fetch coordinator: turns filter and role changes into one authoritative
//! result set.
//!
//! Every trigger mints a new [`RequestEpoch`], cancels the previous request,
//! and spawns the fetch on the current Tokio runtime. Spawned requests never
//! touch state; they report a tagged [`Resolution`] over a channel and
//! [`FetchCoordinator::handle_resolution`] applies it only when its epoch is
//! still the latest. Completion order on the wire is therefore irrelevant.
//!
//! Each fetch runs in its own task under a small supervisor, so a fetch that
//! panics still reports a failed resolution and [`FetchCoordinator::settle`]
//! always returns.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::ports::{ParcelRequest, ParcelSource, ParcelSourceError};
use crate::domain::{
    Access, FilterCriteria, ParcelRecord, Projection, QueryBuilder, ResultProjector,
};

mod state;

pub use state::{Phase, RequestEpoch, SyncSnapshot};

/// How one request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The endpoint returned records.
    Completed(Vec<ParcelRecord>),
    /// The request failed for a reason other than cancellation.
    Failed(ParcelSourceError),
    /// The request was aborted.
    Cancelled,
}

impl From<Result<Vec<ParcelRecord>, ParcelSourceError>> for FetchOutcome {
    fn from(value: Result<Vec<ParcelRecord>, ParcelSourceError>) -> Self {
        match value {
            Ok(records) => Self::Completed(records),
            Err(error) if error.is_cancellation() => Self::Cancelled,
            Err(error) => Self::Failed(error),
        }
    }
}

/// Outcome of one request tagged with the epoch that issued it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Epoch of the request that resolved.
    pub epoch: RequestEpoch,
    /// How it resolved.
    pub outcome: FetchOutcome,
}

/// Whether a resolution changed observable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The resolution belonged to the latest epoch and was applied.
    Applied,
    /// The resolution was stale and ignored.
    Discarded,
}

struct InFlight {
    epoch: RequestEpoch,
    cancel: CancellationToken,
}

/// Owner of the single logical "current request".
pub struct FetchCoordinator {
    source: Arc<dyn ParcelSource>,
    filters: FilterCriteria,
    access: Access,
    latest: RequestEpoch,
    in_flight: Option<InFlight>,
    snapshot: SyncSnapshot,
    snapshot_tx: watch::Sender<SyncSnapshot>,
    resolution_tx: mpsc::UnboundedSender<Resolution>,
    resolution_rx: mpsc::UnboundedReceiver<Resolution>,
}

impl FetchCoordinator {
    /// Build an idle coordinator with unbounded filters and guest access.
    #[must_use]
    pub fn new(source: Arc<dyn ParcelSource>) -> Self {
        let (resolution_tx, resolution_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(SyncSnapshot::default());
        Self {
            source,
            filters: FilterCriteria::default(),
            access: Access::Guest,
            latest: RequestEpoch::INITIAL,
            in_flight: None,
            snapshot: SyncSnapshot::default(),
            snapshot_tx,
            resolution_tx,
            resolution_rx,
        }
    }

    /// Replace the filters and issue a new request.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn apply_filters(&mut self, filters: FilterCriteria) -> RequestEpoch {
        self.filters = filters;
        self.trigger()
    }

    /// Replace the access level and issue a new request.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn set_role(&mut self, access: Access) -> RequestEpoch {
        self.access = access;
        self.trigger()
    }

    /// Replace filters and access together, issuing a single request.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn synchronise(&mut self, filters: FilterCriteria, access: Access) -> RequestEpoch {
        self.filters = filters;
        self.access = access;
        self.trigger()
    }

    /// Ask the in-flight request, if any, to abort. Its resolution is
    /// reported as [`Phase::Cancelled`], never as an error.
    pub fn cancel(&mut self) {
        if let Some(in_flight) = &self.in_flight {
            debug!(epoch = %in_flight.epoch, "cancelling in-flight parcel request");
            in_flight.cancel.cancel();
        }
    }

    /// Apply one resolution. This is the only writer of observable state.
    pub fn handle_resolution(&mut self, resolution: Resolution) -> Disposition {
        let Resolution { epoch, outcome } = resolution;
        if epoch != self.latest
            || self.in_flight.take_if(|in_flight| in_flight.epoch == epoch).is_none()
        {
            debug!(%epoch, latest = %self.latest, "discarding stale parcel resolution");
            return Disposition::Discarded;
        }

        match outcome {
            FetchOutcome::Completed(records) => {
                let Projection { features, skipped } = ResultProjector::project(records);
                info!(
                    %epoch,
                    record_count = features.len(),
                    skipped,
                    "parcel request succeeded"
                );
                self.snapshot.phase = Phase::Success;
                self.snapshot.data = Some(Arc::new(features));
                self.snapshot.error = None;
                self.snapshot.skipped_records = skipped;
            }
            FetchOutcome::Cancelled => {
                debug!(%epoch, "parcel request cancelled");
                self.snapshot.phase = Phase::Cancelled;
            }
            FetchOutcome::Failed(error) => {
                warn!(%epoch, %error, "parcel request failed");
                self.snapshot.phase = Phase::Failed;
                self.snapshot.error = Some(error.to_string());
            }
        }
        self.snapshot.loading = false;
        self.publish();
        Disposition::Applied
    }

    /// Wait for the next resolution and apply it.
    pub async fn process_next(&mut self) -> Option<Disposition> {
        let resolution = self.resolution_rx.recv().await?;
        Some(self.handle_resolution(resolution))
    }

    /// Apply every resolution that has already arrived, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(resolution) = self.resolution_rx.try_recv() {
            self.handle_resolution(resolution);
            processed += 1;
        }
        processed
    }

    /// Process resolutions until the latest request has resolved.
    pub async fn settle(&mut self) -> SyncSnapshot {
        while self.in_flight.is_some() {
            if self.process_next().await.is_none() {
                break;
            }
        }
        self.snapshot()
    }

    /// Current observable state.
    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        self.snapshot.clone()
    }

    /// Subscribe to observable state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Filters of the latest trigger.
    #[must_use]
    pub const fn filters(&self) -> &FilterCriteria {
        &self.filters
    }

    fn trigger(&mut self) -> RequestEpoch {
        let epoch = self.latest.next();
        self.latest = epoch;
        let query = QueryBuilder::build(&self.filters, self.access.role());

        if let Some(previous) = self.in_flight.take() {
            debug!(superseded = %previous.epoch, %epoch, "superseding in-flight parcel request");
            previous.cancel.cancel();
        }
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            epoch,
            cancel: cancel.clone(),
        });

        self.snapshot.phase = Phase::Loading;
        self.snapshot.loading = true;
        self.snapshot.epoch = epoch;
        self.publish();

        debug!(%epoch, role = %query.role(), "issuing parcel request");
        let request = ParcelRequest {
            query,
            token: self.access.token().cloned(),
        };
        let source = Arc::clone(&self.source);
        let resolution_tx = self.resolution_tx.clone();
        let fetch = tokio::spawn(async move {
            let transport_cancel = cancel.clone();
            tokio::select! {
                biased;
                () = cancel.cancelled() => FetchOutcome::Cancelled,
                result = source.fetch_parcels(&request, transport_cancel) => {
                    FetchOutcome::from(result.map(|response| response.records))
                }
            }
        });
        tokio::spawn(async move {
            let outcome = fetch.await.unwrap_or_else(|error| {
                if error.is_cancelled() {
                    FetchOutcome::Cancelled
                } else {
                    warn!(%epoch, %error, "parcel request task died");
                    FetchOutcome::Failed(ParcelSourceError::transport(format!(
                        "parcel request task failed: {error}"
                    )))
                }
            });
            if resolution_tx.send(Resolution { epoch, outcome }).is_err() {
                debug!(%epoch, "coordinator dropped before parcel request resolved");
            }
        });
        epoch
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot.clone());
    }
}
