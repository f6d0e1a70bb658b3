//! Run configuration.
//!
//! A run is described by a TOML file with `[data]`, `[filter]`,
//! `[classifier]`, `[geocoding]` and `[map]` tables. The Dallas
//! configuration in `config/dallas.toml` is embedded at compile time and
//! used when no file is given on the command line.

use std::path::{Path, PathBuf};

use incident_map_incident_models::Category;
use serde::Deserialize;

use crate::type_mapping::KeywordClassifier;

/// Default configuration, baked into the binary.
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/dallas.toml");

/// Errors from loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML is malformed or has the wrong shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parse but make no sense together.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Complete configuration for one map run.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// File locations.
    pub data: DataConfig,
    /// Row filters.
    pub filter: FilterConfig,
    /// Keyword classification.
    pub classifier: ClassifierConfig,
    /// Geocoding query settings.
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Map presentation.
    #[serde(default)]
    pub map: MapConfig,
}

/// Input, cache and output file paths.
///
/// Relative paths are resolved against the project root by
/// [`RunConfig::resolve_paths`].
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Incident ledger CSV.
    pub input: PathBuf,
    /// Zip code coordinate cache JSON.
    pub cache: PathBuf,
    /// Rendered HTML map.
    pub output: PathBuf,
}

/// Row filters applied before aggregation.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Only rows from this year are kept.
    pub year: i32,
}

/// Keyword classification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Category assigned on a keyword match.
    #[serde(default = "default_category")]
    pub category: Category,
    /// Case-insensitive substrings; any match classifies the row.
    pub keywords: Vec<String>,
}

/// Geocoding query settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// Appended to each zip code to disambiguate it
    /// (e.g. `"Dallas, Texas, USA"`).
    #[serde(default = "default_region_qualifier")]
    pub region_qualifier: String,
    /// Overrides the geocoding service's politeness interval.
    #[serde(default)]
    pub rate_limit_ms: Option<u64>,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            region_qualifier: default_region_qualifier(),
            rate_limit_ms: None,
        }
    }
}

/// Map presentation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    /// Legend heading. `{year}` is replaced with the filter year.
    #[serde(default = "default_title")]
    pub title: String,
    /// Legend data source line.
    #[serde(default)]
    pub data_source: Option<String>,
    /// Legend focus line.
    #[serde(default)]
    pub focus: Option<String>,
    /// Initial map center as `[lat, lon]`.
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    /// Initial zoom level.
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Number of categories (by total count) that get a togglable layer.
    #[serde(default = "default_top_layers")]
    pub top_layers: usize,
    /// Categories past this index are drawn gray.
    #[serde(default = "default_max_distinct_colors")]
    pub max_distinct_colors: usize,
    /// Smallest marker radius in pixels.
    #[serde(default = "default_marker_min")]
    pub marker_min: f64,
    /// Largest marker radius in pixels.
    #[serde(default = "default_marker_max")]
    pub marker_max: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            data_source: None,
            focus: None,
            center: default_center(),
            zoom: default_zoom(),
            top_layers: default_top_layers(),
            max_distinct_colors: default_max_distinct_colors(),
            marker_min: default_marker_min(),
            marker_max: default_marker_max(),
        }
    }
}

const fn default_category() -> Category {
    Category::PropertyCrime
}

fn default_region_qualifier() -> String {
    "Dallas, Texas, USA".to_string()
}

fn default_title() -> String {
    "Incident Map".to_string()
}

const fn default_center() -> [f64; 2] {
    [32.7767, -96.7970]
}

const fn default_zoom() -> u8 {
    10
}

const fn default_top_layers() -> usize {
    10
}

const fn default_max_distinct_colors() -> usize {
    50
}

const fn default_marker_min() -> f64 {
    5.0
}

const fn default_marker_max() -> f64 {
    30.0
}

impl RunConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or the values are
    /// inconsistent.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Returns the embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed (this is a compile-time
    /// guarantee since the config is embedded).
    #[must_use]
    pub fn embedded_default() -> Self {
        Self::parse(DEFAULT_CONFIG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded dallas.toml: {e}"))
    }

    /// The map title with `{year}` filled in from `[filter]`.
    #[must_use]
    pub fn map_title(&self) -> String {
        self.map
            .title
            .replace("{year}", &self.filter.year.to_string())
    }

    /// Builds the classifier described by `[classifier]`.
    #[must_use]
    pub fn classifier(&self) -> KeywordClassifier {
        KeywordClassifier::new(self.classifier.category, &self.classifier.keywords)
    }

    /// Makes every relative path under `[data]` absolute against `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        for path in [
            &mut self.data.input,
            &mut self.data.cache,
            &mut self.data.output,
        ] {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.classifier.category.is_fallback() {
            return invalid(format!(
                "classifier category cannot be the fallback '{}'",
                self.classifier.category
            ));
        }
        if self.classifier.keywords.iter().all(|k| k.trim().is_empty()) {
            return invalid("classifier needs at least one keyword".to_string());
        }
        let map = &self.map;
        if !(map.marker_min.is_finite() && map.marker_max.is_finite())
            || map.marker_min > map.marker_max
        {
            return invalid(format!(
                "marker_min ({}) must not exceed marker_max ({})",
                map.marker_min, map.marker_max
            ));
        }
        let [lat, lon] = map.center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return invalid(format!("map center [{lat}, {lon}] is out of range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_title_follows_filter_year() {
        let mut config = RunConfig::embedded_default();
        assert_eq!(config.map_title(), "Dallas Property Crimes Map - 2024");

        config.filter.year = 2023;
        assert_eq!(config.map_title(), "Dallas Property Crimes Map - 2023");
    }

    #[test]
    fn embedded_default_parses() {
        let config = RunConfig::embedded_default();
        assert_eq!(config.filter.year, 2024);
        assert_eq!(config.classifier.category, Category::PropertyCrime);
        assert_eq!(config.classifier.keywords.len(), 12);
        assert_eq!(config.geocoding.region_qualifier, "Dallas, Texas, USA");
        assert_eq!(config.map.top_layers, 10);
        assert!((config.map.marker_max - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = RunConfig::parse(
            r#"
            [data]
            input = "in.csv"
            cache = "cache.json"
            output = "out.html"

            [filter]
            year = 2023

            [classifier]
            keywords = ["THEFT"]
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.category, Category::PropertyCrime);
        assert_eq!(config.map.max_distinct_colors, 50);
        assert_eq!(config.map.zoom, 10);
        assert!(config.geocoding.rate_limit_ms.is_none());
    }

    #[test]
    fn rejects_fallback_category() {
        let err = RunConfig::parse(
            r#"
            [data]
            input = "in.csv"
            cache = "cache.json"
            output = "out.html"
            [filter]
            year = 2023
            [classifier]
            category = "Unclassified"
            keywords = ["THEFT"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_inverted_marker_bounds() {
        let err = RunConfig::parse(
            r#"
            [data]
            input = "in.csv"
            cache = "cache.json"
            output = "out.html"
            [filter]
            year = 2023
            [classifier]
            keywords = ["THEFT"]
            [map]
            marker_min = 40.0
            marker_max = 10.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn resolve_paths_keeps_absolute() {
        let mut config = RunConfig::embedded_default();
        let absolute = std::env::temp_dir().join("cache.json");
        config.data.cache.clone_from(&absolute);
        config.resolve_paths(Path::new("/project"));
        assert_eq!(config.data.cache, absolute);
        assert!(config.data.input.starts_with("/project"));
    }

    #[test]
    fn classifier_from_config() {
        let classifier = RunConfig::embedded_default().classifier();
        assert_eq!(classifier.classify("SHOPLIFTING"), Category::PropertyCrime);
    }
}
