//! Filter criteria, access roles, and the canonical query sent upstream.
//!
//! `FilterCriteria` is what the user edits; `Query` is what actually travels
//! to the parcel endpoint. Only [`QueryBuilder::build`] turns one into the
//! other, so the guest county restriction lives in exactly one place.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access level gating which filter dimensions are honoured upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous visitor without a credential.
    #[default]
    Guest,
    /// Signed-in user holding a bearer credential.
    Registered,
}

impl Role {
    /// Wire representation used for the `user_role` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Registered => "registered",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures raised while building [`FilterCriteria`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterCriteriaError {
    /// A numeric bound was negative, NaN, or infinite.
    #[error("{field} must be a finite, non-negative number")]
    InvalidBound {
        /// Name of the offending bound.
        field: &'static str,
    },
    /// A persisted bound held text that is not a number.
    #[error("{field} must be numeric, got {value:?}")]
    NotNumeric {
        /// Name of the offending bound.
        field: &'static str,
        /// Raw text found in the persisted blob.
        value: String,
    },
}

/// User-selected filters. `None` means unbounded (or unrestricted for
/// `county`).
///
/// ## Invariants
/// - Every numeric bound is finite and non-negative.
///
/// No relation between a `min` and its `max` is enforced; the server is
/// authoritative on range validation.
///
/// # Examples
/// ```
/// use parcels::domain::FilterCriteria;
///
/// let filters = FilterCriteria::default().with_min_price(100_000.0)?;
/// assert_eq!(filters.min_price(), Some(100_000.0));
/// assert!(FilterCriteria::default().with_max_sqft(-1.0).is_err());
/// # Ok::<(), parcels::domain::FilterCriteriaError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FilterCriteriaDto", into = "FilterCriteriaDto")]
pub struct FilterCriteria {
    min_price: Option<f64>,
    max_price: Option<f64>,
    min_sqft: Option<f64>,
    max_sqft: Option<f64>,
    county: Option<String>,
}

impl FilterCriteria {
    /// Build criteria from all five dimensions at once.
    ///
    /// # Errors
    ///
    /// Returns [`FilterCriteriaError::InvalidBound`] when a bound is negative
    /// or not finite.
    pub fn try_new(
        min_price: Option<f64>,
        max_price: Option<f64>,
        min_sqft: Option<f64>,
        max_sqft: Option<f64>,
        county: Option<String>,
    ) -> Result<Self, FilterCriteriaError> {
        Ok(Self {
            min_price: validate_bound("min_price", min_price)?,
            max_price: validate_bound("max_price", max_price)?,
            min_sqft: validate_bound("min_sqft", min_sqft)?,
            max_sqft: validate_bound("max_sqft", max_sqft)?,
            county,
        })
    }

    /// Return a copy with the lower price bound set.
    ///
    /// # Errors
    ///
    /// Returns [`FilterCriteriaError::InvalidBound`] for a negative or
    /// non-finite value.
    pub fn with_min_price(mut self, value: f64) -> Result<Self, FilterCriteriaError> {
        self.min_price = validate_bound("min_price", Some(value))?;
        Ok(self)
    }

    /// Return a copy with the upper price bound set.
    ///
    /// # Errors
    ///
    /// Returns [`FilterCriteriaError::InvalidBound`] for a negative or
    /// non-finite value.
    pub fn with_max_price(mut self, value: f64) -> Result<Self, FilterCriteriaError> {
        self.max_price = validate_bound("max_price", Some(value))?;
        Ok(self)
    }

    /// Return a copy with the lower square-footage bound set.
    ///
    /// # Errors
    ///
    /// Returns [`FilterCriteriaError::InvalidBound`] for a negative or
    /// non-finite value.
    pub fn with_min_sqft(mut self, value: f64) -> Result<Self, FilterCriteriaError> {
        self.min_sqft = validate_bound("min_sqft", Some(value))?;
        Ok(self)
    }

    /// Return a copy with the upper square-footage bound set.
    ///
    /// # Errors
    ///
    /// Returns [`FilterCriteriaError::InvalidBound`] for a negative or
    /// non-finite value.
    pub fn with_max_sqft(mut self, value: f64) -> Result<Self, FilterCriteriaError> {
        self.max_sqft = validate_bound("max_sqft", Some(value))?;
        Ok(self)
    }

    /// Return a copy restricted to one county.
    #[must_use]
    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    /// Lower price bound.
    #[must_use]
    pub const fn min_price(&self) -> Option<f64> {
        self.min_price
    }

    /// Upper price bound.
    #[must_use]
    pub const fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    /// Lower square-footage bound.
    #[must_use]
    pub const fn min_sqft(&self) -> Option<f64> {
        self.min_sqft
    }

    /// Upper square-footage bound.
    #[must_use]
    pub const fn max_sqft(&self) -> Option<f64> {
        self.max_sqft
    }

    /// County restriction as entered by the user.
    #[must_use]
    pub fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }
}

fn validate_bound(
    field: &'static str,
    value: Option<f64>,
) -> Result<Option<f64>, FilterCriteriaError> {
    match value {
        Some(bound) if !bound.is_finite() || bound < 0.0 => {
            Err(FilterCriteriaError::InvalidBound { field })
        }
        other => Ok(other),
    }
}

/// Persisted shape. Bounds may have been stored as raw input text, so both
/// numbers and numeric strings are accepted on the way in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterCriteriaDto {
    #[serde(default)]
    min_price: Option<BoundDto>,
    #[serde(default)]
    max_price: Option<BoundDto>,
    #[serde(default)]
    min_sqft: Option<BoundDto>,
    #[serde(default)]
    max_sqft: Option<BoundDto>,
    #[serde(default)]
    county: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum BoundDto {
    Number(f64),
    Text(String),
}

impl BoundDto {
    fn into_bound(self, field: &'static str) -> Result<Option<f64>, FilterCriteriaError> {
        match self {
            Self::Number(value) => Ok(Some(value)),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| FilterCriteriaError::NotNumeric { field, value: text })
            }
        }
    }
}

fn decode_bound(
    field: &'static str,
    raw: Option<BoundDto>,
) -> Result<Option<f64>, FilterCriteriaError> {
    raw.map_or(Ok(None), |bound| bound.into_bound(field))
}

impl TryFrom<FilterCriteriaDto> for FilterCriteria {
    type Error = FilterCriteriaError;

    fn try_from(value: FilterCriteriaDto) -> Result<Self, Self::Error> {
        let FilterCriteriaDto {
            min_price,
            max_price,
            min_sqft,
            max_sqft,
            county,
        } = value;
        Self::try_new(
            decode_bound("min_price", min_price)?,
            decode_bound("max_price", max_price)?,
            decode_bound("min_sqft", min_sqft)?,
            decode_bound("max_sqft", max_sqft)?,
            county,
        )
    }
}

impl From<FilterCriteria> for FilterCriteriaDto {
    fn from(value: FilterCriteria) -> Self {
        Self {
            min_price: value.min_price.map(BoundDto::Number),
            max_price: value.max_price.map(BoundDto::Number),
            min_sqft: value.min_sqft.map(BoundDto::Number),
            max_sqft: value.max_sqft.map(BoundDto::Number),
            county: value.county,
        }
    }
}

/// Canonical request parameters derived from filters plus role.
///
/// Two semantically equal `(FilterCriteria, Role)` pairs always produce equal
/// queries. Serialises to the endpoint's query-string shape; absent bounds
/// are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    user_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_sqft: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_sqft: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    county: Option<String>,
}

impl Query {
    /// Role the query is issued under.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.user_role
    }

    /// Lower price bound.
    #[must_use]
    pub const fn min_price(&self) -> Option<f64> {
        self.min_price
    }

    /// Upper price bound.
    #[must_use]
    pub const fn max_price(&self) -> Option<f64> {
        self.max_price
    }

    /// Lower square-footage bound.
    #[must_use]
    pub const fn min_sqft(&self) -> Option<f64> {
        self.min_sqft
    }

    /// Upper square-footage bound.
    #[must_use]
    pub const fn max_sqft(&self) -> Option<f64> {
        self.max_sqft
    }

    /// Effective county restriction; always `None` for guests.
    #[must_use]
    pub fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }
}

/// Pure mapping from `(FilterCriteria, Role)` to [`Query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the query actually sent upstream.
    ///
    /// Numeric bounds pass through untouched. `county` is trimmed, dropped
    /// when blank or the `all` sentinel, and always dropped for guests.
    ///
    /// # Examples
    /// ```
    /// use parcels::domain::{FilterCriteria, QueryBuilder, Role};
    ///
    /// let filters = FilterCriteria::default().with_county("Tarrant");
    /// assert_eq!(QueryBuilder::build(&filters, Role::Guest).county(), None);
    /// assert_eq!(
    ///     QueryBuilder::build(&filters, Role::Registered).county(),
    ///     Some("Tarrant")
    /// );
    /// ```
    #[must_use]
    pub fn build(filters: &FilterCriteria, role: Role) -> Query {
        let county = match role {
            Role::Guest => None,
            Role::Registered => filters.county().and_then(normalise_county),
        };
        Query {
            user_role: role,
            min_price: filters.min_price,
            max_price: filters.max_price,
            min_sqft: filters.min_sqft,
            max_sqft: filters.max_sqft,
            county,
        }
    }
}

fn normalise_county(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
