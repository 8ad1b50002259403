//! Delimited-text export of the visible feature set.

use thiserror::Error;

use super::parcel::FeatureCollection;

/// Header row of every export.
pub const EXPORT_HEADER: &str = "ID,Address,County,Price,SqFt";

/// User-facing export outcomes that are not system faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The visible set is empty.
    #[error("No data to export!")]
    NothingToExport,
}

/// Pure mapping from the render model to CSV text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportSerializer;

impl ExportSerializer {
    /// Serialise features as CSV: one header row plus one row per feature.
    ///
    /// The address column is always quoted. The other text columns are quoted
    /// only when they contain a delimiter, a quote, or a line break; embedded
    /// quotes are doubled. A missing square footage renders as an empty field.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NothingToExport`] when `features` is empty.
    ///
    /// # Examples
    /// ```
    /// use parcels::domain::{ExportError, ExportSerializer, FeatureCollection};
    ///
    /// let empty = FeatureCollection::default();
    /// assert_eq!(
    ///     ExportSerializer::serialize(&empty),
    ///     Err(ExportError::NothingToExport)
    /// );
    /// ```
    pub fn serialize(features: &FeatureCollection) -> Result<String, ExportError> {
        if features.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        let rows = features.features().iter().map(|feature| {
            let props = &feature.properties;
            let sqft = props.sqft.map(|value| value.to_string()).unwrap_or_default();
            format!(
                "{},{},{},{},{}",
                csv_field(&props.id),
                quoted(&props.address),
                csv_field(&props.county),
                props.price,
                sqft
            )
        });
        Ok(std::iter::once(EXPORT_HEADER.to_owned())
            .chain(rows)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n', '\r']) {
        quoted(text)
    } else {
        text.to_owned()
    }
}
