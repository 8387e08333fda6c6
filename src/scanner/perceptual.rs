//! Perceptual image fingerprints and similarity scoring.
//!
//! This module provides the [`Fingerprinter`] seam consumed by the scanner
//! and its default implementation, [`PerceptualHasher`], which reduces an
//! image to a 64-bit perceptual hash that stays stable under resizing and
//! recompression.
//!
//! Similarity between two fingerprints is scored on a 0–100 scale from the
//! number of differing bits:
//!
//! ```text
//! similarity = (64 - popcount(a ^ b)) * 100 / 64
//! ```

use image_hasher::{HashAlg, HasherConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of bits in a fingerprint.
pub const FINGERPRINT_BITS: u32 = u64::BITS;

/// Supported perceptual hashing algorithms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// pHash (Perceptual Hash) - DCT-based, most resilient to transformations.
    #[default]
    Phash,
    /// dHash (Difference Hash) - Gradient-based, very fast and effective.
    Dhash,
    /// aHash (Average Hash) - Mean-based, fast but less resilient.
    Ahash,
}

impl PerceptualAlgorithm {
    /// Short lowercase identifier, used in cache filenames.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::Phash => "phash",
            Self::Dhash => "dhash",
            Self::Ahash => "ahash",
        }
    }
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phash => write!(f, "pHash"),
            Self::Dhash => write!(f, "dHash"),
            Self::Ahash => write!(f, "aHash"),
        }
    }
}

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// The bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The hasher produced a hash that does not fit in 64 bits.
    #[error("Unexpected hash width: {0} bytes")]
    HashWidth(usize),
}

/// Computes fingerprints from image bytes and scores their similarity.
///
/// Implementations must be deterministic: identical pixel content always
/// yields the same fingerprint. `similarity` must be symmetric and return
/// its maximum for identical fingerprints.
pub trait Fingerprinter: Send + Sync {
    /// Compute the fingerprint of an encoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError`] if the bytes are not a decodable image.
    fn fingerprint(&self, bytes: &[u8]) -> Result<u64, PerceptualError>;

    /// Compute the fingerprint of an encoded image whose filename is known.
    ///
    /// The name lets implementations decode formats without a magic number
    /// (such as TGA). The default ignores it.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError`] if the bytes are not a decodable image.
    fn fingerprint_named(&self, name: &str, bytes: &[u8]) -> Result<u64, PerceptualError> {
        let _ = name;
        self.fingerprint(bytes)
    }

    /// Score how similar two fingerprints are, higher meaning more similar.
    fn similarity(&self, a: u64, b: u64) -> f64;
}

/// Bit-difference similarity of two 64-bit fingerprints on a 0–100 scale.
///
/// # Example
///
/// ```
/// use imagedupe::scanner::hamming_similarity;
///
/// assert_eq!(hamming_similarity(0, 0), 100.0);
/// assert_eq!(hamming_similarity(0, u64::MAX), 0.0);
/// assert_eq!(hamming_similarity(0, 0b1111), 93.75);
/// ```
#[must_use]
pub fn hamming_similarity(a: u64, b: u64) -> f64 {
    let differing = (a ^ b).count_ones();
    f64::from(FINGERPRINT_BITS - differing) * 100.0 / f64::from(FINGERPRINT_BITS)
}

/// Computes 64-bit perceptual hashes for images.
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
    algorithm: PerceptualAlgorithm,
}

impl PerceptualHasher {
    /// Create a new `PerceptualHasher` with the given algorithm.
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        let mut config = HasherConfig::new().hash_size(8, 8);

        match algorithm {
            PerceptualAlgorithm::Phash => {
                config = config.hash_alg(HashAlg::Median).preproc_dct();
            }
            PerceptualAlgorithm::Dhash => {
                config = config.hash_alg(HashAlg::Gradient);
            }
            PerceptualAlgorithm::Ahash => {
                config = config.hash_alg(HashAlg::Mean);
            }
        }

        Self {
            hasher: config.to_hasher(),
            algorithm,
        }
    }

    /// Get the algorithm used by this hasher.
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }

    fn hash_decoded(&self, img: &image::DynamicImage) -> Result<u64, PerceptualError> {
        let hash = self.hasher.hash_image(img);
        let raw = hash.as_bytes();
        let bits: [u8; 8] = raw
            .try_into()
            .map_err(|_| PerceptualError::HashWidth(raw.len()))?;
        Ok(u64::from_be_bytes(bits))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(PerceptualAlgorithm::Phash)
    }
}

impl Fingerprinter for PerceptualHasher {
    fn fingerprint(&self, bytes: &[u8]) -> Result<u64, PerceptualError> {
        let img = image::load_from_memory(bytes).map_err(PerceptualError::Decode)?;
        self.hash_decoded(&img)
    }

    fn fingerprint_named(&self, name: &str, bytes: &[u8]) -> Result<u64, PerceptualError> {
        // Content sniffing wins; the extension only helps formats without a signature.
        if image::guess_format(bytes).is_ok() {
            return self.fingerprint(bytes);
        }
        let format = image::ImageFormat::from_path(name).map_err(PerceptualError::Decode)?;
        let img =
            image::load_from_memory_with_format(bytes, format).map_err(PerceptualError::Decode)?;
        self.hash_decoded(&img)
    }

    fn similarity(&self, a: u64, b: u64) -> f64 {
        hamming_similarity(a, b)
    }
}
