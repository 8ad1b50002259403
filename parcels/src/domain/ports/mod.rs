//! Driven ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod credential_provider;
mod filter_store;
mod parcel_source;

#[cfg(test)]
pub use credential_provider::MockCredentialProvider;
pub use credential_provider::{CredentialProvider, CredentialProviderError};
#[cfg(test)]
pub use filter_store::MockFilterStore;
pub use filter_store::{FilterStore, FilterStoreError};
pub use parcel_source::{ParcelRequest, ParcelResponse, ParcelSource, ParcelSourceError};
