//! The load, geocode, aggregate and render sequence behind `run` and
//! `geocode`.

use std::time::Instant;

use incident_map_cache::{CacheLoad, CoordinateCache};
use incident_map_cli_utils::{IndicatifProgress, MultiProgress, confirm};
use incident_map_generate::aggregate::{AggregationFilters, aggregate};
use incident_map_generate::render::LeafletRenderer;
use incident_map_generate::{GenerateError, MapOptions, generate_map};
use incident_map_geocoder::ZipQuery;
use incident_map_geocoder::nominatim::NominatimClient;
use incident_map_geocoder::service_registry::find_service;
use incident_map_ingest::{distinct_location_keys, fill_and_persist, unresolved_keys};
use incident_map_source::config::RunConfig;
use incident_map_source::csv_input::CsvIncidentReader;
use incident_map_source::{IncidentReader as _, SourceError};

/// Registry id of the geocoding service the pipeline uses.
const GEOCODING_SERVICE: &str = "nominatim";

/// How far the pipeline goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Stop once the cache is filled and saved.
    GeocodeOnly,
    /// Geocode, then aggregate and render the map.
    Map,
}

/// Runs the pipeline described by `config`.
///
/// A missing input file, a declined confirmation and an empty map all end
/// the run early with `Ok(())` after logging why.
///
/// # Errors
///
/// * If the input exists but cannot be parsed
/// * If the geocoding service cannot be set up
/// * If the cache or the map cannot be written
pub async fn run(
    multi: &MultiProgress,
    config: &RunConfig,
    assume_yes: bool,
    stage: Stage,
) -> Result<(), Box<dyn std::error::Error>> {
    run_with_prompt(multi, config, assume_yes, stage, |prompt| confirm(multi, prompt)).await
}

/// Whether to ask before geocoding.
///
/// Only a cache that failed to load (missing or corrupt) with zip codes
/// still to resolve warrants a prompt, and `assume_yes` skips it.
#[must_use]
pub const fn needs_confirmation(load: &CacheLoad, pending: usize, assume_yes: bool) -> bool {
    pending > 0 && !load.is_loaded() && !assume_yes
}

/// [`run`] with the confirmation prompt supplied by the caller.
async fn run_with_prompt(
    multi: &MultiProgress,
    config: &RunConfig,
    assume_yes: bool,
    stage: Stage,
    ask: impl FnOnce(&str) -> bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let spinner = IndicatifProgress::spinner(multi, "Loading incident data...");
    let outcome = match CsvIncidentReader::default().read_rows(&config.data.input) {
        Ok(outcome) => outcome,
        Err(SourceError::NotFound { path }) => {
            spinner.finish_and_clear();
            log::error!("Data file not found at {}", path.display());
            log::error!("Set [data].input in the config or pass --input");
            return Ok(());
        }
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();
    let rows = outcome.rows;

    let load = CoordinateCache::load_or_empty(&config.data.cache);
    let keys = distinct_location_keys(&rows);
    let pending = match &load {
        CacheLoad::Loaded(cache) => unresolved_keys(&keys, cache).len(),
        CacheLoad::Missing | CacheLoad::Corrupt(_) => keys.len(),
    };

    if needs_confirmation(&load, pending, assume_yes) {
        log::warn!(
            "Geocoding {pending} zip codes will take several minutes due to API rate limits."
        );
        if !ask("Continue?") {
            log::info!("Operation cancelled.");
            return Ok(());
        }
    }
    let mut cache = load.into_cache();

    let service = find_service(GEOCODING_SERVICE)
        .ok_or_else(|| format!("Geocoding service '{GEOCODING_SERVICE}' is not registered"))?;
    let geocoder = NominatimClient::from_service(&service, config.geocoding.rate_limit_ms)?;
    let query = ZipQuery::new(config.geocoding.region_qualifier.clone());

    let progress = IndicatifProgress::geocode_bar(multi, "Geocoding zip codes");
    let report = fill_and_persist(
        &geocoder,
        &mut cache,
        &keys,
        &query,
        &progress,
        &config.data.cache,
    )
    .await?;
    if !report.is_complete() {
        log::warn!(
            "{} zip codes could not be geocoded and will be left off the map",
            report.failed.len()
        );
    }

    if stage == Stage::GeocodeOnly {
        log::info!(
            "Cache holds {} zip codes ({:.1}s)",
            cache.len(),
            start.elapsed().as_secs_f64()
        );
        return Ok(());
    }

    let aggregation = aggregate(
        &rows,
        &cache,
        &config.classifier(),
        &AggregationFilters::for_year(config.filter.year),
    );

    match generate_map(
        &aggregation.records,
        &MapOptions::from_config(config),
        &LeafletRenderer,
        &config.data.output,
    ) {
        Ok(_) => {
            log::info!("Open the HTML file in a web browser to view the map.");
            log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
            Ok(())
        }
        Err(GenerateError::NoMappableData) => {
            log::error!("No mappable data available");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes the cache file so every zip code is resolved again next run.
///
/// # Errors
///
/// If the file exists but cannot be removed.
pub fn clear_cache(
    multi: &MultiProgress,
    config: &RunConfig,
    assume_yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = &config.data.cache;
    if !path.exists() {
        log::info!("No coordinates cache at {}", path.display());
        return Ok(());
    }

    let prompt = format!("Delete cached coordinates at {}?", path.display());
    if !assume_yes && !confirm(multi, &prompt) {
        log::info!("Operation cancelled.");
        return Ok(());
    }

    std::fs::remove_file(path)?;
    log::info!("Removed coordinates cache {}", path.display());
    Ok(())
}
