#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns geocoded incident rows into an interactive HTML map.
//!
//! The pipeline is: [`aggregate::aggregate`] filters and groups raw rows
//! into per-location records, [`style_records`] assigns each record a color
//! ([`colors`]), a radius ([`scale`]) and an overlay, and a
//! [`render::MapRenderer`] turns the result into a document that
//! [`generate_map`] writes to disk.

pub mod aggregate;
pub mod colors;
pub mod render;
pub mod scale;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use incident_map_cache::paths::write_atomic;
use incident_map_incident_models::{AggregatedRecord, Category};
use incident_map_source::config::RunConfig;

use crate::colors::assign_colors;
use crate::render::{MapRenderer, MapStyle, StyledRecord, layer_name};
use crate::scale::MarkerScale;

/// Errors that can occur while producing the map.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Every row was filtered out; there is nothing to draw.
    #[error("No mappable data available")]
    NoMappableData,

    /// Writing the output file failed.
    #[error("Failed to write map to {}: {source}", path.display())]
    Io {
        /// Output file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Rendering settings for one map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// Page title, also shown in the legend.
    pub title: String,
    /// Year the incidents were filtered to.
    pub year: i32,
    /// Where the data came from, shown in the legend if set.
    pub data_source: Option<String>,
    /// Short description of what the map shows, shown in the legend if set.
    pub focus: Option<String>,
    /// Initial view center as `[latitude, longitude]`.
    pub center: [f64; 2],
    /// Initial Leaflet zoom level.
    pub zoom: u8,
    /// How many of the largest categories get their own togglable overlay.
    pub top_layers: usize,
    /// How many categories get a distinct color before falling back to gray.
    pub max_distinct_colors: usize,
    /// Radius range for circle markers.
    pub marker: MarkerScale,
}

impl MapOptions {
    /// Takes the `[map]` settings and the filter year from `config`.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        let map = &config.map;
        Self {
            title: config.map_title(),
            year: config.filter.year,
            data_source: map.data_source.clone(),
            focus: map.focus.clone(),
            center: map.center,
            zoom: map.zoom,
            top_layers: map.top_layers,
            max_distinct_colors: map.max_distinct_colors,
            marker: MarkerScale::new(map.marker_min, map.marker_max),
        }
    }
}

/// Headline numbers for a rendered map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapSummary {
    /// Markers drawn, one per `(zip, category)`.
    pub records: usize,
    /// Distinct zip codes on the map.
    pub unique_locations: usize,
    /// Distinct categories on the map.
    pub unique_categories: usize,
    /// Sum of all mapped incident counts.
    pub total_incidents: u64,
}

impl MapSummary {
    /// Computes the summary of `records`.
    #[must_use]
    pub fn of(records: &[AggregatedRecord]) -> Self {
        let locations: BTreeSet<_> = records.iter().map(|r| r.location_key).collect();
        let categories: BTreeSet<_> = records.iter().map(|r| r.category).collect();
        Self {
            records: records.len(),
            unique_locations: locations.len(),
            unique_categories: categories.len(),
            total_incidents: records.iter().map(|r| r.total_count).sum(),
        }
    }
}

/// Categories in the order they first appear in `records`.
#[must_use]
pub fn category_order(records: &[AggregatedRecord]) -> Vec<Category> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .map(|r| r.category)
        .filter(|category| seen.insert(*category))
        .collect()
}

/// The `n` categories with the largest summed counts, largest first.
///
/// Equal totals keep first-appearance order.
#[must_use]
pub fn top_categories(records: &[AggregatedRecord], n: usize) -> Vec<Category> {
    let mut totals: Vec<(Category, u64)> = category_order(records)
        .into_iter()
        .map(|category| {
            let total = records
                .iter()
                .filter(|r| r.category == category)
                .map(|r| r.total_count)
                .sum();
            (category, total)
        })
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.into_iter().take(n).map(|(category, _)| category).collect()
}

/// Resolves color, radius and overlay for every record.
///
/// Radii are scaled against the smallest and largest `total_count` across
/// all records.
#[must_use]
pub fn style_records<'a>(
    records: &'a [AggregatedRecord],
    options: &MapOptions,
) -> (Vec<StyledRecord<'a>>, MapStyle) {
    let colors = assign_colors(&category_order(records), options.max_distinct_colors);
    let top = top_categories(records, options.top_layers);

    let min = records.iter().map(|r| r.total_count).min().unwrap_or(0);
    let max = records.iter().map(|r| r.total_count).max().unwrap_or(0);

    let styled = records
        .iter()
        .map(|record| StyledRecord {
            record,
            color: colors.get(&record.category).to_string(),
            radius: options.marker.scale(record.total_count, min, max),
            overlay: top
                .contains(&record.category)
                .then(|| layer_name(record.category.as_ref())),
        })
        .collect();

    let style = MapStyle {
        title: options.title.clone(),
        year: options.year,
        data_source: options.data_source.clone(),
        focus: options.focus.clone(),
        center: options.center,
        zoom: options.zoom,
        overlays: top.iter().map(|c| layer_name(c.as_ref())).collect(),
    };

    (styled, style)
}

/// Styles `records`, renders them and writes the document to `output`.
///
/// # Errors
///
/// * [`GenerateError::NoMappableData`] if `records` is empty; nothing is
///   written.
/// * [`GenerateError::Io`] if the output cannot be written.
pub fn generate_map(
    records: &[AggregatedRecord],
    options: &MapOptions,
    renderer: &dyn MapRenderer,
    output: &Path,
) -> Result<MapSummary, GenerateError> {
    if records.is_empty() {
        return Err(GenerateError::NoMappableData);
    }

    log::info!("Creating interactive map...");
    let (styled, style) = style_records(records, options);
    let html = renderer.render(&styled, &style);

    write_atomic(output, html.as_bytes()).map_err(|source| GenerateError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    log::info!("Map saved to: {}", output.display());

    let summary = MapSummary::of(records);
    log::info!("Summary Statistics:");
    log::info!("  Total records mapped: {}", summary.records);
    log::info!("  Unique zip codes: {}", summary.unique_locations);
    log::info!("  Unique categories: {}", summary.unique_categories);
    log::info!(
        "  Total incidents: {}",
        render::format_count(summary.total_incidents)
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use incident_map_incident_models::{Coordinate, SubtypeBreakdown};

    use super::*;
    use crate::colors::{FALLBACK_GRAY, color_for_index};
    use crate::render::LeafletRenderer;

    fn record(zip: u32, category: Category, total: u64) -> AggregatedRecord {
        AggregatedRecord {
            location_key: zip,
            category,
            total_count: total,
            coordinate: Coordinate::new(32.78, -96.80).unwrap(),
            breakdown: SubtypeBreakdown::from_first_seen(vec![("BURGLARY".to_string(), total)]),
        }
    }

    fn options() -> MapOptions {
        MapOptions::from_config(&RunConfig::embedded_default())
    }

    #[test]
    fn options_follow_config() {
        let options = options();
        assert_eq!(options.year, 2024);
        assert_eq!(options.title, "Dallas Property Crimes Map - 2024");
        assert_eq!(options.top_layers, 10);
        assert_eq!(options.marker, MarkerScale::default());
        assert!((options.center[0] - 32.7767).abs() < 1e-9);
        assert!((options.center[1] + 96.797).abs() < 1e-9);
    }

    #[test]
    fn categories_in_first_appearance_order() {
        let records = [
            record(75204, Category::Unclassified, 1),
            record(75201, Category::PropertyCrime, 9),
            record(75201, Category::Unclassified, 2),
        ];
        assert_eq!(
            category_order(&records),
            vec![Category::Unclassified, Category::PropertyCrime]
        );
        assert_eq!(
            top_categories(&records, 10),
            vec![Category::PropertyCrime, Category::Unclassified]
        );
        assert_eq!(top_categories(&records, 1), vec![Category::PropertyCrime]);
    }

    #[test]
    fn styles_single_record_at_midpoint() {
        let records = [record(75201, Category::PropertyCrime, 5)];
        let (styled, style) = style_records(&records, &options());

        assert_eq!(styled.len(), 1);
        assert_eq!(styled[0].color, color_for_index(0));
        assert!((styled[0].radius - 17.5).abs() < f64::EPSILON);
        assert_eq!(styled[0].overlay.as_deref(), Some("Property Crime"));
        assert_eq!(style.overlays, vec!["Property Crime".to_string()]);
    }

    #[test]
    fn categories_outside_top_layers_go_on_the_map() {
        let mut options = options();
        options.top_layers = 1;
        options.max_distinct_colors = 1;
        let records = [
            record(75201, Category::PropertyCrime, 5),
            record(75204, Category::Unclassified, 30),
        ];
        let (styled, style) = style_records(&records, &options);

        assert_eq!(style.overlays, vec!["Unclassified".to_string()]);
        assert_eq!(styled[0].overlay, None);
        assert_eq!(styled[0].color, color_for_index(0));
        assert_eq!(styled[1].color, FALLBACK_GRAY);
        assert!((styled[0].radius - 5.0).abs() < f64::EPSILON);
        assert!((styled[1].radius - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_input_writes_nothing() {
        let path = std::env::temp_dir().join("incident_map_generate_test_empty.html");
        let _ = std::fs::remove_file(&path);

        let err = generate_map(&[], &options(), &LeafletRenderer, &path).unwrap_err();
        assert!(matches!(err, GenerateError::NoMappableData));
        assert!(!path.exists());
    }

    #[test]
    fn writes_map_and_summarizes() {
        let dir = std::env::temp_dir().join("incident_map_generate_test_write");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("map.html");

        let records = [
            record(75201, Category::PropertyCrime, 1200),
            record(75204, Category::PropertyCrime, 34),
        ];
        let summary = generate_map(&records, &options(), &LeafletRenderer, &path).unwrap();

        assert_eq!(
            summary,
            MapSummary {
                records: 2,
                unique_locations: 2,
                unique_categories: 1,
                total_incidents: 1234,
            }
        );
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("Dallas Property Crimes Map - 2024"));
        assert!(html.contains("Property Crime: 1,200 incidents"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
