#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zip code geocoding for the incident map.
//!
//! Resolves free-text queries such as `"75201, Dallas, Texas, USA"` to a
//! [`Coordinate`] through the [`Geocoder`] trait. The only provider is
//! Nominatim / OpenStreetMap ([`nominatim`]), configured by the embedded
//! TOML in `services/` and loaded through the [`service_registry`].
//!
//! Lookups are single-shot: a failed lookup is reported as "not found" and
//! retrying is left to the caller.

pub mod nominatim;
pub mod service_registry;

use async_trait::async_trait;
use incident_map_incident_models::{Coordinate, LocationKey};
use thiserror::Error;

/// Resolves a single free-text query to a coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns the coordinate for `query`, or `None` if it could not be
    /// resolved for any reason.
    async fn resolve(&self, query: &str) -> Option<Coordinate>;
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP status {status}")]
    Status {
        /// Status code returned.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Builds geocoding queries for zip codes.
///
/// The region qualifier (e.g. `"Dallas, Texas, USA"`) disambiguates bare
/// zip codes and comes from configuration, not from the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipQuery {
    region_qualifier: String,
}

impl ZipQuery {
    /// Creates a query builder appending `region_qualifier` to every zip.
    #[must_use]
    pub fn new(region_qualifier: impl Into<String>) -> Self {
        Self {
            region_qualifier: region_qualifier.into().trim().to_string(),
        }
    }

    /// Returns the query text for `zip`.
    #[must_use]
    pub fn for_zip(&self, zip: LocationKey) -> String {
        if self.region_qualifier.is_empty() {
            zip.to_string()
        } else {
            format!("{zip}, {}", self.region_qualifier)
        }
    }
}
