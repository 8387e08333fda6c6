//! Scanner module for folder listing and image fingerprinting.
//!
//! This module provides functionality for:
//! - Listing the supported images directly inside a folder
//! - Computing 64-bit perceptual fingerprints from image bytes
//! - Scoring the similarity of two fingerprints
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Single-level folder listing and extension filtering
//! - [`perceptual`]: The [`Fingerprinter`] seam and its image-hash implementation
//!
//! # Example
//!
//! ```no_run
//! use imagedupe::scanner::{Fingerprinter, PerceptualHasher, Walker};
//! use std::path::Path;
//!
//! let hasher = PerceptualHasher::default();
//! for image in Walker::new(Path::new(".")).list_images().unwrap() {
//!     let bytes = std::fs::read(&image.path).unwrap();
//!     match hasher.fingerprint_named(&image.name, &bytes) {
//!         Ok(fp) => println!("{}: {:016x}", image.name, fp),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod perceptual;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use perceptual::{
    hamming_similarity, Fingerprinter, PerceptualAlgorithm, PerceptualError, PerceptualHasher,
};
pub use walker::{is_supported_image, Walker, SUPPORTED_EXTENSIONS};

/// A supported image discovered in the scanned folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Filename without any directory prefix; the cache key
    pub name: String,
    /// Full path used to read the file
    pub path: PathBuf,
}

impl ImageFile {
    /// Create a new ImageFile.
    #[must_use]
    pub fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }
}

/// Errors that can occur while listing a folder.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when reading the folder.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The folder disappeared while it was being listed.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while reading the folder.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while fingerprinting a single file.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that could not be read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a decodable image.
    #[error("Failed to fingerprint {path}: {source}")]
    Decode {
        /// File that could not be decoded
        path: PathBuf,
        /// The underlying decoding error
        #[source]
        source: PerceptualError,
    },
}

/// Read an image from disk and compute its fingerprint.
///
/// # Errors
///
/// Returns [`FingerprintError`] if the file cannot be read or decoded.
pub fn fingerprint_file(
    fingerprinter: &dyn Fingerprinter,
    image: &ImageFile,
) -> Result<u64, FingerprintError> {
    let bytes = std::fs::read(&image.path).map_err(|source| FingerprintError::Read {
        path: image.path.clone(),
        source,
    })?;
    fingerprinter
        .fingerprint_named(&image.name, &bytes)
        .map_err(|source| FingerprintError::Decode {
            path: image.path.clone(),
            source,
        })
}
