//! Driven port for persisting the last applied filters.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::FilterCriteria;

define_port_error! {
    /// Errors surfaced by filter persistence.
    pub enum FilterStoreError {
        /// The key cannot name a stored entry.
        InvalidKey { key: String } =>
            "invalid filter store key: {key:?}",
        /// Reading or writing the backing store failed.
        Io { message: String } =>
            "filter store I/O failed: {message}",
        /// Filters could not be encoded.
        Encode { message: String } =>
            "filter encode failed: {message}",
        /// A stored blob is not a valid filter set.
        Decode { message: String } =>
            "stored filters are invalid: {message}",
    }
}

/// Key-value persistence for `FilterCriteria` blobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FilterStore: Send + Sync {
    /// Persist `filters` under `key`, replacing any previous value.
    async fn save(&self, key: &str, filters: &FilterCriteria) -> Result<(), FilterStoreError>;

    /// Load the filters stored under `key`; `None` when absent.
    async fn load(&self, key: &str) -> Result<Option<FilterCriteria>, FilterStoreError>;
}
