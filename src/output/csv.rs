//! CSV output formatter for similarity scan results.
//!
//! One row per matching pair, most similar first.
//!
//! # Columns
//!
//! - `similarity`: Score between 0 and 100
//! - `first`, `second`: Filenames of the pair, in lexicographic order
//! - `first_path`, `second_path`: The same files joined onto the scanned folder

use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::ImageMatch;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    similarity: f64,
    first: &'a str,
    second: &'a str,
    first_path: String,
    second_path: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    folder: &'a Path,
    matches: &'a [ImageMatch],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(folder: &'a Path, matches: &'a [ImageMatch]) -> Self {
        Self { folder, matches }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when there are no matches.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(["similarity", "first", "second", "first_path", "second_path"])?;

        for m in self.matches {
            csv_writer.serialize(CsvRow {
                similarity: m.similarity,
                first: &m.first,
                second: &m.second,
                first_path: self.folder.join(&m.first).to_string_lossy().into_owned(),
                second_path: self.folder.join(&m.second).to_string_lossy().into_owned(),
            })?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
