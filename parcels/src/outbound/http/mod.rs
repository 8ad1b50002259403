//! Parcel endpoint outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `ParcelSource`
//! port.

mod dto;
mod http_source;

pub use http_source::{ParcelHttpSource, ParcelHttpSourceError};
