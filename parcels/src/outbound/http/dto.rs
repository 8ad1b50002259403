//! DTOs for decoding parcel endpoint responses.
//!
//! The adapter decodes into these transport DTOs first, then maps into domain
//! records (`ParcelRecord`) in one pass.

use serde::Deserialize;

use crate::domain::ParcelRecord;

#[derive(Debug, Deserialize)]
pub(super) struct ParcelEnvelopeDto {
    #[serde(default)]
    pub(super) count: Option<usize>,
    pub(super) data: Vec<ParcelDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ParcelDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) address: Option<String>,
    #[serde(default)]
    pub(super) county: Option<String>,
    #[serde(default)]
    pub(super) sqft: Option<f64>,
    pub(super) price: f64,
    // Null geometry is kept as empty text so the projector can skip the
    // record instead of failing the batch.
    #[serde(default)]
    pub(super) geometry: Option<String>,
}

impl ParcelEnvelopeDto {
    pub(super) fn into_domain_records(self) -> Vec<ParcelRecord> {
        self.data.into_iter().map(ParcelDto::into_domain_record).collect()
    }
}

impl ParcelDto {
    fn into_domain_record(self) -> ParcelRecord {
        ParcelRecord {
            id: self.id,
            address: self.address.unwrap_or_default(),
            county: self.county.unwrap_or_default(),
            sqft: self.sqft,
            price: self.price,
            geometry: self.geometry.unwrap_or_default(),
        }
    }
}
