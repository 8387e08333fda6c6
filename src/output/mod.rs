//! Output formatters for similarity scan results.
//!
//! - Text for reading in a terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use imagedupe::duplicates::ImageScanner;
//! use imagedupe::error::ExitCode;
//! use imagedupe::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let scanner = ImageScanner::with_defaults();
//! let (matches, summary) = scanner.process(Path::new("."), 80.0).unwrap();
//!
//! let output = JsonOutput::new(&matches, &summary, 80.0, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
