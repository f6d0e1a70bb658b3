//! CSV incident ledger reader.
//!
//! The ledger's first column holds the count measure regardless of its
//! header. The remaining columns are located by name: `Zip Code`,
//! `Type of Incident` and `Year of Incident`. Numeric cells exported by
//! spreadsheet tools are often written as floats (`75201.0`), so integral
//! float text is accepted wherever an integer is expected.

use std::fs::File;
use std::path::Path;

use incident_map_incident_models::{IncidentRecord, LocationKey};

use crate::{IncidentReader, ReadOutcome, SourceError};

/// Header of the nullable zip code column.
pub const ZIP_COLUMN: &str = "Zip Code";
/// Header of the free-text incident type column.
pub const TYPE_COLUMN: &str = "Type of Incident";
/// Header of the incident year column.
pub const YEAR_COLUMN: &str = "Year of Incident";

/// Reads incident rows from a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvIncidentReader {
    delimiter: u8,
}

impl Default for CsvIncidentReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvIncidentReader {
    /// Creates a reader with a custom field delimiter.
    #[must_use]
    pub const fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Parses rows from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the header row is missing a required
    /// column or the CSV is malformed.
    pub fn read_from<R: std::io::Read>(
        &self,
        input: R,
        source: &Path,
    ) -> Result<ReadOutcome, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(input);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        if headers.is_empty() {
            return Err(SourceError::MissingColumn {
                column: "count".to_string(),
                path: source.to_path_buf(),
            });
        }

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| SourceError::MissingColumn {
                    column: name.to_string(),
                    path: source.to_path_buf(),
                })
        };
        let zip_idx = column(ZIP_COLUMN)?;
        let type_idx = column(TYPE_COLUMN)?;
        let year_idx = column(YEAR_COLUMN)?;

        let mut outcome = ReadOutcome::default();

        for (line, result) in reader.records().enumerate() {
            let record = result?;
            let field = |idx: usize| record.get(idx).unwrap_or("").trim();

            let count = parse_integral(field(0)).and_then(|v| u64::try_from(v).ok());
            let year = parse_integral(field(year_idx)).and_then(|v| i32::try_from(v).ok());

            let (Some(count), Some(year)) = (count, year) else {
                log::debug!(
                    "Skipping row {}: count={:?} year={:?}",
                    line + 2,
                    field(0),
                    field(year_idx)
                );
                outcome.skipped += 1;
                continue;
            };

            let location_key = parse_integral(field(zip_idx))
                .and_then(|v| LocationKey::try_from(v).ok());

            outcome.rows.push(IncidentRecord {
                location_key,
                raw_type: field(type_idx).to_string(),
                year,
                count,
            });
        }

        log::info!(
            "Successfully loaded {} incident records from {}",
            outcome.rows.len(),
            source.display()
        );
        if outcome.skipped > 0 {
            log::warn!(
                "Skipped {} rows with an unparseable count or year",
                outcome.skipped
            );
        }

        Ok(outcome)
    }
}

impl IncidentReader for CsvIncidentReader {
    fn read_rows(&self, source: &Path) -> Result<ReadOutcome, SourceError> {
        let file = match File::open(source) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound {
                    path: source.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        self.read_from(std::io::BufReader::new(file), source)
    }
}

/// Parses `"75201"` or `"75201.0"` into an integer.
///
/// Returns `None` for empty cells, non-numbers, and non-integral floats.
#[allow(clippy::cast_possible_truncation)]
fn parse_integral(cell: &str) -> Option<i64> {
    if cell.is_empty() {
        return None;
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Some(v);
    }
    let v = cell.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
count,Zip Code,Type of Incident,Year of Incident
3,75201,BURGLARY,2024
2,75201.0,SHOPLIFTING,2024
5,,ASSAULT,2024
x,75202,THEFT,2024
1,75203,THEFT,2023.0
";

    #[test]
    fn reads_rows_and_skips_bad_counts() {
        let outcome = CsvIncidentReader::default()
            .read_from(SAMPLE.as_bytes(), Path::new("sample.csv"))
            .unwrap();

        assert_eq!(outcome.rows.len(), 4);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            outcome.rows[0],
            IncidentRecord {
                location_key: Some(75201),
                raw_type: "BURGLARY".to_string(),
                year: 2024,
                count: 3,
            }
        );
        assert_eq!(outcome.rows[1].location_key, Some(75201));
        assert_eq!(outcome.rows[2].location_key, None);
        assert_eq!(outcome.rows[3].year, 2023);
    }

    #[test]
    fn first_column_is_count_whatever_its_name() {
        let csv = "Incidents,Year of Incident,Type of Incident,Zip Code\n7,2024,THEFT,75204\n";
        let outcome = CsvIncidentReader::default()
            .read_from(csv.as_bytes(), Path::new("renamed.csv"))
            .unwrap();
        assert_eq!(outcome.rows[0].count, 7);
        assert_eq!(outcome.rows[0].location_key, Some(75204));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "count,Zip Code,Year of Incident\n1,75201,2024\n";
        let err = CsvIncidentReader::default()
            .read_from(csv.as_bytes(), Path::new("bad.csv"))
            .unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn { ref column, .. } if column == TYPE_COLUMN));
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = std::env::temp_dir().join("incident_map_source_test_missing.csv");
        let _ = std::fs::remove_file(&path);
        let err = CsvIncidentReader::default().read_rows(&path).unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[test]
    fn parse_integral_rejects_fractions() {
        assert_eq!(parse_integral("75201"), Some(75201));
        assert_eq!(parse_integral("75201.0"), Some(75201));
        assert_eq!(parse_integral("75201.5"), None);
        assert_eq!(parse_integral("nan"), None);
        assert_eq!(parse_integral(""), None);
    }
}
