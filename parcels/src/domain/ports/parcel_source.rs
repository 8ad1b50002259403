//! Driven port for fetching parcels from the parcel endpoint.
//!
//! The domain owns the request shape and response contract so the fetch
//! coordinator can stay transport-agnostic.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::define_port_error;
use crate::domain::{BearerToken, ParcelRecord, Query};

/// One parcel fetch: the canonical query plus an optional credential.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRequest {
    /// Query parameters to send.
    pub query: Query,
    /// Bearer credential; only present for registered access.
    pub token: Option<BearerToken>,
}

/// Records returned for one request, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParcelResponse {
    /// Returned parcel records.
    pub records: Vec<ParcelRecord>,
}

define_port_error! {
    /// Errors surfaced while fetching parcels.
    pub enum ParcelSourceError {
        /// Network transport failed before a response was received.
        Transport { message: String } =>
            "parcel transport failed: {message}",
        /// The request exceeded its timeout.
        Timeout { message: String } =>
            "parcel request timed out: {message}",
        /// The endpoint answered with a non-success status.
        Status { status: u16, message: String } =>
            "parcel endpoint returned status {status}: {message}",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "parcel response decode failed: {message}",
        /// The request was aborted by its cancellation signal.
        Cancelled =>
            "parcel request cancelled",
    }
}

impl ParcelSourceError {
    /// Whether this error only reports an abort requested by the caller.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Port for querying parcels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParcelSource: Send + Sync {
    /// Fetch parcels for one request.
    ///
    /// `cancel` is advisory: implementations should abort early once it
    /// fires, but callers must not rely on it for correctness.
    async fn fetch_parcels(
        &self,
        request: &ParcelRequest,
        cancel: CancellationToken,
    ) -> Result<ParcelResponse, ParcelSourceError>;
}
