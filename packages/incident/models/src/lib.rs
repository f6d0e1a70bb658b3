#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident rows, coordinates, and the coarse category taxonomy.
//!
//! This crate defines the data model shared across the incident-map
//! workspace: raw [`IncidentRecord`] rows as read from the ledger, the
//! [`Coordinate`] a zip code resolves to, the [`Category`] a free-text
//! incident type is classified into, and the per-location
//! [`AggregatedRecord`] handed to the map renderer.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A zip code used to join incident rows to coordinates.
pub type LocationKey = u32;

/// A single input row from the incident ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    /// Zip code, if the row has one.
    pub location_key: Option<LocationKey>,
    /// Free-text incident type exactly as reported.
    pub raw_type: String,
    /// Year the incident occurred.
    pub year: i32,
    /// Number of incidents this row represents.
    pub count: u64,
}

/// Coarse classification bucket for a free-text incident type.
///
/// Declaration order is the canonical ordering of categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Category {
    /// Burglary, theft, robbery, vandalism and related offenses
    #[serde(rename = "Property Crime")]
    #[strum(serialize = "Property Crime")]
    PropertyCrime,
    /// No configured keyword matched
    #[serde(rename = "Unclassified")]
    #[strum(serialize = "Unclassified")]
    Unclassified,
}

impl Category {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::PropertyCrime, Self::Unclassified]
    }

    /// Whether this is the fallback bucket for unmatched incident types.
    #[must_use]
    pub const fn is_fallback(self) -> bool {
        matches!(self, Self::Unclassified)
    }
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `-90..=90`.
    pub latitude: f64,
    /// Longitude in degrees, `-180..=180`.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate after checking both components are in range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if either component is NaN or out
    /// of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidCoordinateError {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Error returned when a [`Coordinate`] component is out of range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// The rejected latitude.
    pub latitude: f64,
    /// The rejected longitude.
    pub longitude: f64,
}

impl std::fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate ({}, {}): expected latitude -90..=90 and longitude -180..=180",
            self.latitude, self.longitude
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// Per-location counts of the original incident types, largest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtypeBreakdown(Vec<(String, u64)>);

impl SubtypeBreakdown {
    /// Builds a breakdown from `(raw_type, count)` pairs in first-seen
    /// order.
    ///
    /// Entries are sorted by descending count; the sort is stable so equal
    /// counts keep their input order.
    #[must_use]
    pub fn from_first_seen(mut entries: Vec<(String, u64)>) -> Self {
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self(entries)
    }

    /// Iterates `(raw_type, count)` pairs, largest count first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Sum of all subtype counts, saturating at `u64::MAX`.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0
            .iter()
            .fold(0, |total: u64, (_, count)| total.saturating_add(*count))
    }

    /// Number of distinct subtypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no subtypes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One renderable record: a location, a category, and its counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    /// Zip code.
    pub location_key: LocationKey,
    /// Category the underlying rows were classified into.
    pub category: Category,
    /// Summed count of all rows for this location and category.
    pub total_count: u64,
    /// Where the zip code resolved to.
    pub coordinate: Coordinate,
    /// Original incident types at this location with their counts.
    pub breakdown: SubtypeBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_display_roundtrip() {
        for category in Category::all() {
            let label = category.to_string();
            assert_eq!(Category::from_str(&label).unwrap(), *category);
        }
        assert_eq!(Category::PropertyCrime.to_string(), "Property Crime");
    }

    #[test]
    fn category_serializes_as_label() {
        let json = serde_json::to_string(&Category::PropertyCrime).unwrap();
        assert_eq!(json, "\"Property Crime\"");
    }

    #[test]
    fn only_unclassified_is_fallback() {
        assert!(Category::Unclassified.is_fallback());
        assert!(!Category::PropertyCrime.is_fallback());
    }

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(32.78, -96.80).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn breakdown_sorts_descending_with_stable_ties() {
        let breakdown = SubtypeBreakdown::from_first_seen(vec![
            ("THEFT".to_string(), 2),
            ("BURGLARY".to_string(), 5),
            ("SHOPLIFTING".to_string(), 2),
        ]);
        let order: Vec<&str> = breakdown.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["BURGLARY", "THEFT", "SHOPLIFTING"]);
        assert_eq!(breakdown.total(), 9);
        assert_eq!(breakdown.len(), 3);
    }
}
