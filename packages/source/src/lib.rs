#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident ledger input and classification.
//!
//! Rows are read through the [`IncidentReader`] trait so the rest of the
//! pipeline never depends on a particular file format. [`csv_input`]
//! provides the CSV implementation, [`type_mapping`] classifies free-text
//! incident types into the shared [`Category`](incident_map_incident_models::Category)
//! taxonomy, and [`config`] holds the run configuration.

pub mod config;
pub mod csv_input;
pub mod progress;
pub mod type_mapping;

use std::path::{Path, PathBuf};

use incident_map_incident_models::IncidentRecord;

/// Errors that can occur while reading incident data.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The input file does not exist.
    #[error("Input file not found: {}", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is missing from the header row.
    #[error("Missing column '{column}' in {}", path.display())]
    MissingColumn {
        /// Header name that was expected.
        column: String,
        /// File that was being read.
        path: PathBuf,
    },
}

/// Rows read from a source along with how many were rejected.
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    /// Successfully parsed rows, in file order.
    pub rows: Vec<IncidentRecord>,
    /// Rows skipped because a count or year could not be parsed.
    pub skipped: u64,
}

/// Anything that can produce incident rows from a path.
pub trait IncidentReader {
    /// Reads every row from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if `source` does not exist, or
    /// another [`SourceError`] if the file cannot be parsed.
    fn read_rows(&self, source: &Path) -> Result<ReadOutcome, SourceError>;
}
