//! Command-line interface definitions for imagedupe.
//!
//! Global options (verbosity, color, config file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Report visually similar images in a folder
//! imagedupe scan ~/Pictures
//!
//! # Stricter matching, machine-readable output
//! imagedupe scan ~/Pictures --threshold 95 --output json
//!
//! # Inspect or reset the fingerprint cache
//! imagedupe cache stats
//! imagedupe cache clear ~/Pictures
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::PerceptualAlgorithm;

/// Find visually similar images in a folder.
///
/// imagedupe fingerprints every image with a perceptual hash, caches the
/// fingerprints between runs and reports every pair whose similarity reaches
/// the threshold.
#[derive(Debug, Parser)]
#[command(name = "imagedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a folder for similar images
    Scan(ScanArgs),
    /// Inspect or reset the fingerprint cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Folder to scan (subfolders are not visited)
    #[arg(value_name = "FOLDER")]
    pub folder: PathBuf,

    /// Minimum similarity (0-100) for a pair to be reported [default: 80]
    #[arg(short, long, value_name = "PERCENT", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Fingerprint algorithm [default: phash]
    #[arg(short, long, value_enum)]
    pub algorithm: Option<PerceptualAlgorithm>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Fingerprint cache file
    ///
    /// If not specified, a platform-specific path is used. dHash and aHash
    /// use a sibling file named after the algorithm (`hashes-dhash.json`).
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Do not read or write the fingerprint cache
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,

    /// Abort on the first image that cannot be fingerprinted
    #[arg(long)]
    pub strict: bool,

    /// Number of threads for fingerprinting [default: 4]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,
}

/// Cache maintenance subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print the location of the cache file
    Path(CacheArgs),
    /// Remove one folder's fingerprints, or the whole cache
    Clear {
        /// Folder whose entries should be removed (all folders if omitted)
        #[arg(value_name = "FOLDER")]
        folder: Option<PathBuf>,

        #[command(flatten)]
        args: CacheArgs,
    },
    /// Show cached folders and fingerprint counts
    Stats(CacheArgs),
}

/// Options shared by the cache subcommands.
#[derive(Debug, Default, Args)]
pub struct CacheArgs {
    /// Fingerprint cache file
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Algorithm whose cache file to use [default: phash]
    #[arg(short, long, value_enum)]
    pub algorithm: Option<PerceptualAlgorithm>,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a similarity threshold in the range 0-100.
///
/// # Examples
///
/// ```
/// use imagedupe::cli::parse_threshold;
///
/// assert_eq!(parse_threshold("80").unwrap(), 80.0);
/// assert_eq!(parse_threshold("92.5%").unwrap(), 92.5);
/// assert!(parse_threshold("101").is_err());
/// ```
///
/// # Errors
///
/// Returns an error if the value is not a number or lies outside 0-100.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let num_str = s.strip_suffix('%').unwrap_or(s).trim();
    let value: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if !(0.0..=100.0).contains(&value) {
        return Err(format!("Threshold must be between 0 and 100, got {value}"));
    }
    Ok(value)
}
