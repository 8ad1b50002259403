//! Reqwest-backed parcel source adapter.
//!
//! This adapter owns transport details only: query-string serialisation,
//! bearer headers, timeout and HTTP error mapping, cancellation, and JSON
//! decoding into domain records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Request, StatusCode, Url};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::dto::ParcelEnvelopeDto;
use crate::domain::ports::{ParcelRequest, ParcelResponse, ParcelSource, ParcelSourceError};
use crate::domain::{ParcelRecord, Role};

const PARCELS_RESOURCE: &str = "parcels";
const DEFAULT_USER_AGENT: &str = "parcels-map-client/0.1";

/// Errors raised while constructing the adapter.
#[derive(Debug, Error)]
pub enum ParcelHttpSourceError {
    /// The base URL cannot carry a path.
    #[error("base URL {url} cannot be a base for the parcels resource")]
    InvalidBase {
        /// Offending base URL.
        url: Url,
    },
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Parcel source adapter that performs HTTP GET requests against
/// `<base>/parcels`.
pub struct ParcelHttpSource {
    client: Client,
    endpoint: Url,
}

impl ParcelHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = ParcelHttpSource::new(Url::parse("http://localhost:8000")?, timeout)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the base URL cannot carry a path or the reqwest
    /// client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ParcelHttpSourceError> {
        let endpoint = parcels_endpoint(base)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// Bearer credentials are attached only to registered queries.
    fn build_request(&self, request: &ParcelRequest) -> Result<Request, ParcelSourceError> {
        let mut builder = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .query(&request.query);
        if request.query.role() == Role::Registered
            && let Some(token) = &request.token
        {
            builder = builder.bearer_auth(token.expose());
        }
        builder.build().map_err(map_transport_error)
    }

    async fn send(&self, request: &ParcelRequest) -> Result<ParcelResponse, ParcelSourceError> {
        let http_request = self.build_request(request)?;
        let response = self
            .client
            .execute(http_request)
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let records = parse_records(body.as_ref())?;
        Ok(ParcelResponse { records })
    }
}

#[async_trait]
impl ParcelSource for ParcelHttpSource {
    async fn fetch_parcels(
        &self,
        request: &ParcelRequest,
        cancel: CancellationToken,
    ) -> Result<ParcelResponse, ParcelSourceError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ParcelSourceError::cancelled()),
            result = self.send(request) => result,
        }
    }
}

fn parcels_endpoint(base: Url) -> Result<Url, ParcelHttpSourceError> {
    let mut endpoint = base.clone();
    endpoint
        .path_segments_mut()
        .map_err(|()| ParcelHttpSourceError::InvalidBase { url: base })?
        .pop_if_empty()
        .push(PARCELS_RESOURCE);
    Ok(endpoint)
}

fn parse_records(body: &[u8]) -> Result<Vec<ParcelRecord>, ParcelSourceError> {
    let decoded: ParcelEnvelopeDto = serde_json::from_slice(body).map_err(|error| {
        ParcelSourceError::decode(format!("invalid parcel JSON payload: {error}"))
    })?;
    if let Some(count) = decoded.count
        && count != decoded.data.len()
    {
        debug!(
            count,
            received = decoded.data.len(),
            "parcel count disagrees with payload"
        );
    }
    Ok(decoded.into_domain_records())
}

fn map_transport_error(error: reqwest::Error) -> ParcelSourceError {
    if error.is_timeout() {
        ParcelSourceError::timeout(error.to_string())
    } else if error.is_decode() {
        ParcelSourceError::decode(error.to_string())
    } else {
        ParcelSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ParcelSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned()
    } else {
        body_preview
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ParcelSourceError::timeout(format!("status {}: {message}", status.as_u16()))
        }
        _ => ParcelSourceError::status(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
