//! Runtime settings loaded via OrthoConfig.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STATE_DIR: &str = ".parcels";
const DEFAULT_FILTERS_KEY: &str = "dallas_filters";
const DEFAULT_EXPORT_PATH: &str = "dallas_parcels.csv";

/// Settings for the parcel endpoint, session credentials, and local state.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PARCELS")]
pub struct ParcelsSettings {
    /// Base URL of the parcel API.
    pub api_url: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// File holding the bearer token of a signed-in session.
    pub token_file: Option<PathBuf>,
    /// Directory for persisted filters.
    pub state_dir: Option<PathBuf>,
    /// Key of the persisted filter blob.
    pub filters_key: Option<String>,
    /// Destination of CSV exports.
    pub export_path: Option<PathBuf>,
}

impl ParcelsSettings {
    /// Return the configured API URL, falling back to the local default.
    #[must_use]
    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    /// Parse the configured API URL.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the configured value is not a URL.
    pub fn api_base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.api_url())
    }

    /// Return the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Return the token file, if one is configured.
    #[must_use]
    pub fn token_file(&self) -> Option<PathBuf> {
        self.token_file.clone()
    }

    /// Return the state directory, falling back to the default.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
    }

    /// Return the persisted-filter key, falling back to the default.
    #[must_use]
    pub fn filters_key(&self) -> &str {
        self.filters_key.as_deref().unwrap_or(DEFAULT_FILTERS_KEY)
    }

    /// Return the export path, falling back to the default.
    #[must_use]
    pub fn export_path(&self) -> PathBuf {
        self.export_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH))
    }
}
