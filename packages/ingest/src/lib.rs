#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fills the zip code coordinate cache for an incident ledger.
//!
//! Every distinct zip code in the input that is not already cached is sent
//! to the [`Geocoder`] one at a time, in the order the zip codes first
//! appear. A lookup that fails is logged and skipped; the batch never stops
//! early. Once the batch is done the cache is written back to disk exactly
//! once, so partial success survives even when some lookups failed.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use incident_map_cache::{CacheError, CoordinateCache};
use incident_map_geocoder::{Geocoder, ZipQuery};
use incident_map_incident_models::{IncidentRecord, LocationKey};
use incident_map_source::progress::ProgressCallback;

/// A progress line is logged after this many zip codes.
pub const PROGRESS_INTERVAL: usize = 10;

/// Errors from a fill-and-persist pass.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Geocoding finished but the cache could not be written.
    ///
    /// The resolved coordinates are still in the in-memory cache.
    #[error("Failed to persist {} resolved coordinates: {source}", report.resolved)]
    Persist {
        /// What the geocoding pass achieved before the write failed.
        report: FillReport,
        /// Underlying cache error.
        source: CacheError,
    },
}

/// Summary of one fill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Zip codes that were not cached and were sent to the geocoder.
    pub requested: usize,
    /// How many of those resolved.
    pub resolved: usize,
    /// Zip codes the geocoder could not resolve, in request order.
    pub failed: Vec<LocationKey>,
}

impl FillReport {
    /// Whether every requested zip code resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Distinct zip codes in `rows`, in first-seen order. Rows without a zip
/// code are ignored.
#[must_use]
pub fn distinct_location_keys(rows: &[IncidentRecord]) -> Vec<LocationKey> {
    let mut seen = BTreeSet::new();
    rows.iter()
        .filter_map(|row| row.location_key)
        .filter(|key| seen.insert(*key))
        .collect()
}

/// The subset of `keys` that `cache` has no coordinate for, deduplicated
/// and in input order.
#[must_use]
pub fn unresolved_keys(keys: &[LocationKey], cache: &CoordinateCache) -> Vec<LocationKey> {
    let mut seen = BTreeSet::new();
    keys.iter()
        .copied()
        .filter(|key| !cache.contains(*key) && seen.insert(*key))
        .collect()
}

/// Resolves every key in `keys` that `cache` does not already hold.
///
/// Cached keys are never sent to `geocoder`. Progress advances by one per
/// attempted key, and every [`PROGRESS_INTERVAL`] keys a progress message
/// is emitted.
pub async fn fill_cache(
    geocoder: &dyn Geocoder,
    cache: &mut CoordinateCache,
    keys: &[LocationKey],
    query: &ZipQuery,
    progress: &Arc<dyn ProgressCallback>,
) -> FillReport {
    let pending = unresolved_keys(keys, cache);
    let total = pending.len();

    let mut report = FillReport {
        requested: total,
        ..FillReport::default()
    };

    if total == 0 {
        log::info!("All {} zip codes already cached", keys.len());
        progress.finish_and_clear();
        return report;
    }

    log::info!("Geocoding {total} unique zip codes (this may take several minutes)...");
    progress.set_total(total as u64);

    for (i, key) in pending.into_iter().enumerate() {
        let done = i + 1;
        log::debug!("Geocoding {done}/{total}: {key}");

        if let Some(coordinate) = geocoder.resolve(&query.for_zip(key)).await {
            cache.insert(key, coordinate);
            report.resolved += 1;
        } else {
            log::debug!("Skipping zip code {key}: could not be geocoded");
            report.failed.push(key);
        }

        progress.inc(1);
        if done % PROGRESS_INTERVAL == 0 {
            log::info!("Progress: {done}/{total} completed");
            progress.set_message(format!("{done}/{total} zip codes"));
        }
    }

    progress.finish(format!(
        "Geocoded {}/{total} zip codes",
        report.resolved
    ));
    log::info!(
        "Successfully geocoded {}/{total} zip codes",
        report.resolved
    );

    report
}

/// Runs [`fill_cache`] and then writes the cache to `path`.
///
/// The cache is written once, after the whole batch, regardless of how many
/// lookups failed. Nothing is written when every key was already cached.
///
/// # Errors
///
/// Returns [`IngestError::Persist`] if the cache file cannot be written.
pub async fn fill_and_persist(
    geocoder: &dyn Geocoder,
    cache: &mut CoordinateCache,
    keys: &[LocationKey],
    query: &ZipQuery,
    progress: &Arc<dyn ProgressCallback>,
    path: &Path,
) -> Result<FillReport, IngestError> {
    let report = fill_cache(geocoder, cache, keys, query, progress).await;

    if report.requested == 0 {
        return Ok(report);
    }

    match cache.save(path) {
        Ok(()) => Ok(report),
        Err(source) => {
            log::error!(
                "Could not write coordinates cache {} ({} zip codes resolved this run are only in memory): {source}",
                path.display(),
                report.resolved
            );
            Err(IngestError::Persist { report, source })
        }
    }
}
