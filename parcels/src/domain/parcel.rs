//! Parcel records and their GeoJSON render model.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// One parcel as returned by the parcel endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    /// Unique parcel identifier.
    pub id: String,
    /// Street address.
    pub address: String,
    /// County name.
    pub county: String,
    /// Living area in square feet, when known.
    pub sqft: Option<f64>,
    /// Appraised value.
    pub price: f64,
    /// GeoJSON geometry encoded as text.
    pub geometry: String,
}

/// Reasons a record's geometry text is not usable GeoJSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The text is not JSON at all.
    #[error("geometry is not valid JSON: {message}")]
    InvalidJson {
        /// Parser diagnostic.
        message: String,
    },
    /// The JSON is not an object.
    #[error("geometry must be a JSON object")]
    NotAnObject,
    /// The `type` member is missing or not a GeoJSON geometry type.
    #[error("unsupported geometry type: {kind}")]
    UnsupportedType {
        /// The type found, or `<missing>`.
        kind: String,
    },
    /// A required array member is absent.
    #[error("{kind} geometry requires an array `{member}` member")]
    MissingMember {
        /// Geometry type being validated.
        kind: String,
        /// Required member name.
        member: &'static str,
    },
}

const COORDINATE_TYPES: [&str; 6] = [
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
];

/// Parsed GeoJSON geometry object.
///
/// ## Invariants
/// - `type` names a GeoJSON geometry type.
/// - Coordinate geometries carry a `coordinates` array;
///   `GeometryCollection` carries a `geometries` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Geometry(Map<String, Value>);

impl Geometry {
    /// Parse geometry text.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] describing why the text is not a GeoJSON
    /// geometry.
    ///
    /// # Examples
    /// ```
    /// use parcels::domain::Geometry;
    ///
    /// let geometry = Geometry::parse(r#"{"type":"Point","coordinates":[-96.8,32.78]}"#)?;
    /// assert_eq!(geometry.kind(), "Point");
    /// assert!(Geometry::parse("not json").is_err());
    /// # Ok::<(), parcels::domain::GeometryError>(())
    /// ```
    pub fn parse(raw: &str) -> Result<Self, GeometryError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|error| GeometryError::InvalidJson {
                message: error.to_string(),
            })?;
        let Value::Object(object) = value else {
            return Err(GeometryError::NotAnObject);
        };
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("<missing>")
            .to_owned();

        let member = if COORDINATE_TYPES.contains(&kind.as_str()) {
            "coordinates"
        } else if kind == "GeometryCollection" {
            "geometries"
        } else {
            return Err(GeometryError::UnsupportedType { kind });
        };
        if !object.get(member).is_some_and(Value::is_array) {
            return Err(GeometryError::MissingMember { kind, member });
        }
        Ok(Self(object))
    }

    /// GeoJSON geometry type name.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or_default()
    }
}

/// Flat property bag attached to every rendered feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureProperties {
    /// Parcel identifier.
    pub id: String,
    /// Street address.
    pub address: String,
    /// Appraised value.
    pub price: f64,
    /// Living area in square feet, when known.
    pub sqft: Option<f64>,
    /// County name.
    pub county: String,
}

/// GeoJSON `Feature` for one parcel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct RenderFeature {
    /// Parsed geometry.
    pub geometry: Geometry,
    /// Parcel attributes.
    pub properties: FeatureProperties,
}

/// GeoJSON `FeatureCollection` consumed by the map surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    features: Vec<RenderFeature>,
}

impl FeatureCollection {
    /// Wrap features in input order.
    #[must_use]
    pub const fn new(features: Vec<RenderFeature>) -> Self {
        Self { features }
    }

    /// Features in projection order.
    #[must_use]
    pub fn features(&self) -> &[RenderFeature] {
        &self.features
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Result of projecting one batch of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Renderable features, one per well-formed record, in input order.
    pub features: FeatureCollection,
    /// Records dropped because their geometry could not be parsed.
    pub skipped: usize,
}

/// Pure mapping from parcel records to the render model.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultProjector;

impl ResultProjector {
    /// Project records into GeoJSON features.
    ///
    /// A record with malformed geometry is skipped and counted; it never
    /// aborts the batch.
    #[must_use]
    pub fn project(records: Vec<ParcelRecord>) -> Projection {
        let mut skipped = 0;
        let mut features = Vec::with_capacity(records.len());
        for record in records {
            match Geometry::parse(&record.geometry) {
                Ok(geometry) => features.push(RenderFeature {
                    geometry,
                    properties: FeatureProperties {
                        id: record.id,
                        address: record.address,
                        price: record.price,
                        sqft: record.sqft,
                        county: record.county,
                    },
                }),
                Err(error) => {
                    warn!(parcel_id = %record.id, %error, "skipping parcel with malformed geometry");
                    skipped += 1;
                }
            }
        }
        Projection {
            features: FeatureCollection::new(features),
            skipped,
        }
    }
}
