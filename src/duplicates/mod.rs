//! Similar image detection module.
//!
//! This module provides functionality for:
//! - Reconciling a folder's cached fingerprints with its contents
//! - Pairwise similarity matching over a fingerprint table
//! - Ordering and inspecting match results

pub mod finder;
pub mod matches;

pub use finder::{folder_key, FinderError, ImageScanner, ScanSummary, ScannerConfig, SkippedFile};
pub use matches::{find_matches, sort_by_similarity, ImageMatch};
