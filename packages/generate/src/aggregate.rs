//! Filters, classifies and groups incident rows into per-location records.
//!
//! Rows pass through, in order: the year filter, classification (rows in
//! an excluded category are dropped), and the cache check (rows whose zip
//! code has no coordinate cannot be placed and are dropped). Survivors are
//! grouped by `(zip, category)` for the totals and by
//! `(zip, category, raw type)` for the subtype breakdown.

use std::collections::{BTreeMap, BTreeSet};

use incident_map_cache::CoordinateCache;
use incident_map_incident_models::{
    AggregatedRecord, Category, IncidentRecord, LocationKey, SubtypeBreakdown,
};
use incident_map_source::type_mapping::KeywordClassifier;

/// Which rows take part in aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationFilters {
    /// Only rows from this year are kept.
    pub year: i32,
    /// Rows classified into any of these categories are dropped.
    pub excluded: BTreeSet<Category>,
}

impl AggregationFilters {
    /// Keeps rows from `year` and drops the fallback category.
    #[must_use]
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            excluded: BTreeSet::from([Category::Unclassified]),
        }
    }
}

/// Row counts after each aggregation stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Rows handed in.
    pub rows_in: usize,
    /// Rows left after the year filter.
    pub after_year: usize,
    /// Rows left after dropping excluded categories.
    pub classified: usize,
    /// Rows left after dropping zip codes without a coordinate.
    pub mappable: usize,
}

/// Output of [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// One record per `(zip, category)`, ordered by zip then category.
    pub records: Vec<AggregatedRecord>,
    /// Stage-by-stage row counts.
    pub stats: AggregationStats,
}

type GroupKey = (LocationKey, Category);

/// Groups `rows` into one [`AggregatedRecord`] per `(zip, category)`.
///
/// Locations with no surviving rows never appear; no zero-count records are
/// produced. Each record's breakdown sums to its `total_count`.
#[must_use]
pub fn aggregate(
    rows: &[IncidentRecord],
    cache: &CoordinateCache,
    classifier: &KeywordClassifier,
    filters: &AggregationFilters,
) -> Aggregation {
    let mut stats = AggregationStats {
        rows_in: rows.len(),
        ..AggregationStats::default()
    };

    let mut totals: BTreeMap<GroupKey, u64> = BTreeMap::new();
    // Subtype counts per group, in the order each subtype first appears.
    let mut subtypes: BTreeMap<GroupKey, Vec<(String, u64)>> = BTreeMap::new();

    for row in rows {
        if row.year != filters.year {
            continue;
        }
        stats.after_year += 1;

        let category = classifier.classify(&row.raw_type);
        if filters.excluded.contains(&category) {
            continue;
        }
        stats.classified += 1;

        let Some(zip) = row.location_key.filter(|zip| cache.contains(*zip)) else {
            continue;
        };
        stats.mappable += 1;

        let key = (zip, category);
        let total = totals.entry(key).or_insert(0);
        *total = total.saturating_add(row.count);

        let entries = subtypes.entry(key).or_default();
        if let Some(entry) = entries.iter_mut().find(|(name, _)| *name == row.raw_type) {
            entry.1 = entry.1.saturating_add(row.count);
        } else {
            entries.push((row.raw_type.clone(), row.count));
        }
    }

    let records = totals
        .into_iter()
        .filter_map(|((zip, category), total_count)| {
            let coordinate = cache.get(zip)?;
            let breakdown =
                SubtypeBreakdown::from_first_seen(subtypes.remove(&(zip, category))?);
            Some(AggregatedRecord {
                location_key: zip,
                category,
                total_count,
                coordinate,
                breakdown,
            })
        })
        .collect();

    log::info!(
        "Filtered {} rows: {} from {}, {} classified, {} with known coordinates",
        stats.rows_in,
        stats.after_year,
        filters.year,
        stats.classified,
        stats.mappable
    );

    Aggregation { records, stats }
}
