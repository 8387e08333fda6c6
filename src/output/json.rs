//! JSON output formatter for similarity scan results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "folder": "/home/user/Pictures",
//!   "threshold": 80.0,
//!   "matches": [
//!     {
//!       "first": "a.jpg",
//!       "second": "b.jpg",
//!       "first_path": "/home/user/Pictures/a.jpg",
//!       "second_path": "/home/user/Pictures/b.jpg",
//!       "similarity": 92.1875
//!     }
//!   ],
//!   "summary": {
//!     "total_images": 3,
//!     "cache_hits": 2,
//!     "fingerprinted": 1,
//!     "removed": 0,
//!     "skipped": [],
//!     "cache_saved": true,
//!     "cache_warnings": [],
//!     "matches": 1,
//!     "scan_duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "ID000"
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::duplicates::{ImageMatch, ScanSummary, SkippedFile};
use crate::error::ExitCode;

/// A single matching pair in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMatch {
    /// Lexicographically smaller filename
    pub first: String,
    /// Lexicographically larger filename
    pub second: String,
    /// Full path of `first`
    pub first_path: String,
    /// Full path of `second`
    pub second_path: String,
    /// Similarity score (0-100)
    pub similarity: f64,
}

impl JsonMatch {
    fn from_match(folder: &Path, m: &ImageMatch) -> Self {
        Self {
            first: m.first.clone(),
            second: m.second.clone(),
            first_path: folder.join(&m.first).to_string_lossy().into_owned(),
            second_path: folder.join(&m.second).to_string_lossy().into_owned(),
            similarity: m.similarity,
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Supported images found in the folder
    pub total_images: usize,
    /// Fingerprints served from the cache
    pub cache_hits: usize,
    /// Fingerprints computed during the scan
    pub fingerprinted: usize,
    /// Stale cache entries removed
    pub removed: usize,
    /// Images that could not be fingerprinted
    pub skipped: Vec<SkippedFile>,
    /// Whether the cache was written
    pub cache_saved: bool,
    /// Non-fatal cache problems
    pub cache_warnings: Vec<String>,
    /// Number of matching pairs
    pub matches: usize,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "ID000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_images: summary.total_images,
            cache_hits: summary.cache_hits,
            fingerprinted: summary.fingerprinted,
            removed: summary.removed,
            skipped: summary.skipped.clone(),
            cache_saved: summary.cache_saved,
            cache_warnings: summary.cache_warnings.clone(),
            matches: summary.matches,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Scanned folder
    pub folder: String,
    /// Threshold the matches were filtered with
    pub threshold: f64,
    /// Matching pairs, most similar first
    pub matches: Vec<JsonMatch>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from matches, summary and exit code.
    ///
    /// ```
    /// use imagedupe::duplicates::{ImageMatch, ScanSummary};
    /// use imagedupe::error::ExitCode;
    /// use imagedupe::output::json::JsonOutput;
    ///
    /// let matches = vec![ImageMatch::new("a.jpg", "b.jpg", 92.0)];
    /// let output = JsonOutput::new(&matches, &ScanSummary::default(), 80.0, ExitCode::Success);
    /// assert_eq!(output.matches.len(), 1);
    /// ```
    #[must_use]
    pub fn new(
        matches: &[ImageMatch],
        summary: &ScanSummary,
        threshold: f64,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            folder: summary.folder.to_string_lossy().into_owned(),
            threshold,
            matches: matches
                .iter()
                .map(|m| JsonMatch::from_match(&summary.folder, m))
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
