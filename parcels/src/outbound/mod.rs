//! Outbound adapters implementing the domain ports.

pub mod credentials;
pub mod export_file;
pub mod filter_store;
pub mod http;
