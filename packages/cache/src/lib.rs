#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zip code coordinate cache stored as a JSON file.
//!
//! Resolving a zip code costs a rate-limited network call, so every
//! successful resolution is kept here and a cached key is never looked up
//! again. On disk the cache is a JSON object mapping string zip codes to
//! `[lat, lon]` pairs:
//!
//! ```json
//! { "75201": [32.7876, -96.7994] }
//! ```
//!
//! In memory keys are plain integers regardless of how they were written.

pub mod paths;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use incident_map_incident_models::{Coordinate, InvalidCoordinateError, LocationKey};

/// Errors from reading or writing the cache file.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error (file read/write/rename).
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a JSON object of `[lat, lon]` pairs.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A key is not an integral zip code.
    #[error("Invalid cache key '{key}'")]
    InvalidKey {
        /// The offending key text.
        key: String,
    },

    /// A coordinate is out of range.
    #[error("Invalid coordinate for {key}: {source}")]
    InvalidCoordinate {
        /// Zip code the coordinate belongs to.
        key: LocationKey,
        /// Range check failure.
        source: InvalidCoordinateError,
    },
}

/// Outcome of [`CoordinateCache::load_or_empty`].
#[derive(Debug)]
pub enum CacheLoad {
    /// The file was read successfully.
    Loaded(CoordinateCache),
    /// No cache file exists yet.
    Missing,
    /// The file exists but could not be read or parsed.
    Corrupt(CacheError),
}

impl CacheLoad {
    /// Whether a usable cache was found on disk.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The loaded cache, or an empty one if the file was missing or corrupt.
    #[must_use]
    pub fn into_cache(self) -> CoordinateCache {
        match self {
            Self::Loaded(cache) => cache,
            Self::Missing | Self::Corrupt(_) => CoordinateCache::default(),
        }
    }
}

/// In-memory mapping from zip code to coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateCache {
    entries: BTreeMap<LocationKey, Coordinate>,
}

impl CoordinateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a zip code.
    #[must_use]
    pub fn get(&self, key: LocationKey) -> Option<Coordinate> {
        self.entries.get(&key).copied()
    }

    /// Whether `key` has a coordinate.
    #[must_use]
    pub fn contains(&self, key: LocationKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Stores a coordinate, replacing any previous value.
    pub fn insert(&mut self, key: LocationKey, coordinate: Coordinate) {
        self.entries.insert(key, coordinate);
    }

    /// Number of cached zip codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached zip codes in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = LocationKey> + '_ {
        self.entries.keys().copied()
    }

    /// Removes every entry, forcing all keys to be resolved again.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Parses the on-disk JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the JSON is malformed, a key is not an
    /// integral zip code, or a coordinate is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, CacheError> {
        let raw: BTreeMap<String, [f64; 2]> = serde_json::from_str(json)?;
        let mut cache = Self::new();
        for (key_text, [lat, lon]) in raw {
            let key = normalize_key(&key_text).ok_or(CacheError::InvalidKey { key: key_text })?;
            let coordinate = Coordinate::new(lat, lon)
                .map_err(|source| CacheError::InvalidCoordinate { key, source })?;
            cache.insert(key, coordinate);
        }
        Ok(cache)
    }

    /// Serializes to the on-disk JSON representation (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, CacheError> {
        let raw: BTreeMap<String, [f64; 2]> = self
            .entries
            .iter()
            .map(|(key, c)| (key.to_string(), [c.latitude, c.longitude]))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Reads the cache file at `path`.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Option<Self>, CacheError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_json_str(&contents).map(Some)
    }

    /// Reads the cache file, folding every failure into a [`CacheLoad`].
    ///
    /// Never fails: a missing file and a corrupt file both leave the caller
    /// with nothing cached, but are logged differently.
    #[must_use]
    pub fn load_or_empty(path: &Path) -> CacheLoad {
        match Self::load(path) {
            Ok(Some(cache)) => {
                log::info!(
                    "Loaded {} zip code coordinates from cache {}",
                    cache.len(),
                    path.display()
                );
                CacheLoad::Loaded(cache)
            }
            Ok(None) => {
                log::info!(
                    "No coordinates cache found at {}, will need to geocode zip codes",
                    path.display()
                );
                CacheLoad::Missing
            }
            Err(e) => {
                log::warn!("Error loading coordinates cache {}: {e}", path.display());
                CacheLoad::Corrupt(e)
            }
        }
    }

    /// Writes the cache to `path` atomically (write `.tmp`, then rename).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if serialization or any file operation fails.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let contents = self.to_json_string()?;
        paths::write_atomic(path, contents.as_bytes()).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Saved {} zip code coordinates to cache {}",
            self.len(),
            path.display()
        );
        Ok(())
    }
}

impl FromIterator<(LocationKey, Coordinate)> for CoordinateCache {
    fn from_iter<I: IntoIterator<Item = (LocationKey, Coordinate)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parses a cache key written as `"75201"` or `"75201.0"`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn normalize_key(text: &str) -> Option<LocationKey> {
    let text = text.trim();
    if let Ok(key) = text.parse::<LocationKey>() {
        return Some(key);
    }
    let value = text.parse::<f64>().ok()?;
    if value.is_finite()
        && value.fract() == 0.0
        && value >= 0.0
        && value <= f64::from(LocationKey::MAX)
    {
        Some(value as LocationKey)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dallas() -> Coordinate {
        Coordinate::new(32.78, -96.80).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("incident_map_cache_test")
            .join(name)
    }

    #[test]
    fn normalizes_keys_on_load() {
        let cache = CoordinateCache::from_json_str(
            r#"{ "75201": [32.78, -96.80], "75202.0": [32.77, -96.79] }"#,
        )
        .unwrap();
        assert_eq!(cache.keys().collect::<Vec<_>>(), vec![75201, 75202]);
        assert_eq!(cache.get(75201), Some(dallas()));
    }

    #[test]
    fn rejects_fractional_key() {
        let err = CoordinateCache::from_json_str(r#"{ "75201.5": [32.78, -96.80] }"#).unwrap_err();
        assert!(matches!(err, CacheError::InvalidKey { .. }));
    }

    #[test]
    fn rejects_malformed_entry() {
        assert!(matches!(
            CoordinateCache::from_json_str(r#"{ "75201": [32.78] }"#),
            Err(CacheError::Json(_))
        ));
        assert!(matches!(
            CoordinateCache::from_json_str(r#"{ "75201": [132.78, -96.80] }"#),
            Err(CacheError::InvalidCoordinate { key: 75201, .. })
        ));
    }

    #[test]
    fn reads_are_idempotent() {
        let cache: CoordinateCache = [(75201, dallas())].into_iter().collect();
        assert_eq!(cache.get(75201), cache.get(75201));
        assert_eq!(cache.get(75201), Some(dallas()));
        assert_eq!(cache.get(99999), None);
    }

    #[test]
    fn save_then_load_restores_entries() {
        let path = temp_path("roundtrip.json");
        let _ = std::fs::remove_file(&path);

        let mut cache = CoordinateCache::new();
        cache.insert(75201, dallas());
        cache.insert(75204, Coordinate::new(32.80, -96.79).unwrap());
        cache.save(&path).unwrap();

        let loaded = CoordinateCache::load(&path).unwrap().unwrap();
        assert_eq!(loaded, cache);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["75201"], serde_json::json!([32.78, -96.80]));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_missing_not_error() {
        let path = temp_path("does_not_exist.json");
        let _ = std::fs::remove_file(&path);
        assert!(CoordinateCache::load(&path).unwrap().is_none());
        assert!(matches!(
            CoordinateCache::load_or_empty(&path),
            CacheLoad::Missing
        ));
    }

    #[test]
    fn corrupt_file_is_reported_as_corrupt() {
        let path = temp_path("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let load = CoordinateCache::load_or_empty(&path);
        assert!(matches!(load, CacheLoad::Corrupt(CacheError::Json(_))));
        assert!(load.into_cache().is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_save_keeps_previous_file() {
        let dir = temp_path("blocked");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.json");

        let mut cache = CoordinateCache::new();
        cache.insert(75201, dallas());
        cache.save(&path).unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir_all(dir.join("cache.json.tmp")).unwrap();
        cache.insert(75202, dallas());
        assert!(matches!(cache.save(&path), Err(CacheError::Io { .. })));

        let on_disk = CoordinateCache::load(&path).unwrap().unwrap();
        assert_eq!(on_disk.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache: CoordinateCache = [(75201, dallas())].into_iter().collect();
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(75201));
    }
}
