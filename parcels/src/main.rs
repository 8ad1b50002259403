//! Headless parcel map driver: restores the saved filters, synchronises once,
//! optionally applies one-off filter overrides, and exports the visible set.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::Parser;
use ortho_config::OrthoConfig;
use parcels::config::ParcelsSettings;
use parcels::domain::ports::{CredentialProvider, FilterStore, ParcelSource};
use parcels::domain::{
    ExportError, FeatureCollection, FilterCriteria, FilterCriteriaError, MapSession,
    MapSessionPorts, SyncSnapshot,
};
use parcels::outbound::credentials::TokenFileCredentials;
use parcels::outbound::export_file::{ExportFileError, write_export};
use parcels::outbound::filter_store::JsonFileFilterStore;
use parcels::outbound::http::ParcelHttpSource;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// `parcels` command arguments. Bounds given here replace the saved ones and
/// are persisted like any other applied filter set.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "parcels",
    about = "Synchronise and export parcels for the configured filters",
    version
)]
struct CliArgs {
    /// Lower appraised-value bound.
    #[arg(long = "min-price", value_name = "usd")]
    min_price: Option<f64>,
    /// Upper appraised-value bound.
    #[arg(long = "max-price", value_name = "usd")]
    max_price: Option<f64>,
    /// Lower living-area bound.
    #[arg(long = "min-sqft", value_name = "sqft")]
    min_sqft: Option<f64>,
    /// Upper living-area bound.
    #[arg(long = "max-sqft", value_name = "sqft")]
    max_sqft: Option<f64>,
    /// County restriction; `all` clears it. Ignored for guests.
    #[arg(long = "county", value_name = "name")]
    county: Option<String>,
    /// Write the visible parcels to the configured export path.
    #[arg(long = "export")]
    export: bool,
}

impl CliArgs {
    fn has_overrides(&self) -> bool {
        self.min_price.is_some()
            || self.max_price.is_some()
            || self.min_sqft.is_some()
            || self.max_sqft.is_some()
            || self.county.is_some()
    }

    fn merge_into(&self, base: &FilterCriteria) -> Result<FilterCriteria, FilterCriteriaError> {
        FilterCriteria::try_new(
            self.min_price.or(base.min_price()),
            self.max_price.or(base.max_price()),
            self.min_sqft.or(base.min_sqft()),
            self.max_sqft.or(base.max_sqft()),
            self.county
                .clone()
                .or_else(|| base.county().map(str::to_owned)),
        )
    }
}

fn main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let settings = ParcelsSettings::load_from_iter([OsString::from("parcels")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;

    let base_url = settings
        .api_base_url()
        .map_err(|error| io::Error::other(format!("parse API URL: {error}")))?;
    let source: Arc<dyn ParcelSource> = Arc::new(
        ParcelHttpSource::new(base_url, settings.request_timeout())
            .map_err(|error| io::Error::other(format!("create parcel source: {error}")))?,
    );
    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(TokenFileCredentials::new(settings.token_file()));
    let filter_store: Arc<dyn FilterStore> = Arc::new(
        JsonFileFilterStore::open(settings.state_dir())
            .map_err(|error| io::Error::other(format!("open filter store: {error}")))?,
    );

    let mut session = MapSession::new(
        MapSessionPorts::new(source, credentials, filter_store),
        settings.filters_key(),
    );
    session.start().await;
    let mut snapshot = session.settle().await;

    if args.has_overrides() {
        let filters = args
            .merge_into(session.filters())
            .map_err(|error| io::Error::other(format!("invalid filter override: {error}")))?;
        info!("applying command-line filter overrides");
        session.apply_filters(filters).await;
        snapshot = session.settle().await;
    }

    report(&snapshot);

    if args.export {
        let path = settings.export_path();
        let empty = FeatureCollection::default();
        let features = snapshot.data.as_deref().unwrap_or(&empty);
        match write_export(&path, features) {
            Ok(rows) => {
                println!("export_path={}", path.display());
                println!("export_rows={rows}");
            }
            Err(ExportFileError::Export(ExportError::NothingToExport)) => {
                println!("{}", ExportError::NothingToExport);
            }
            Err(error) => return Err(io::Error::other(error.to_string())),
        }
    }

    Ok(())
}

fn report(snapshot: &SyncSnapshot) {
    println!("phase={:?}", snapshot.phase);
    println!("epoch={}", snapshot.epoch);
    println!("result_count={}", snapshot.result_count());
    println!("skipped_records={}", snapshot.skipped_records);
    if let Some(error) = &snapshot.error {
        println!("error={error}");
    }
}
