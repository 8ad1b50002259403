//! Parcel map synchronisation library.
//!
//! The domain core keeps one authoritative parcel result set in step with the
//! user's filters and access level; outbound adapters reach the parcel API,
//! the session token, and local storage.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(test)]
pub(crate) mod test_support;
