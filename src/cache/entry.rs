//! Serialized layout of the fingerprint cache file.
//!
//! ```json
//! {
//!   "folders": {
//!     "/home/user/Pictures": {
//!       "imageHashes": { "a.jpg": 1234567890123456789 }
//!     }
//!   }
//! }
//! ```
//!
//! Keys are written in lower camel case. Files written with upper camel case
//! keys (`Folders`, `ImageHashes`) are still accepted and are rewritten in
//! the lower camel case form on the next save.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::scanner::ImageFile;

/// The whole persisted cache: one entry per scanned folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    /// Absolute folder path to that folder's fingerprints.
    #[serde(default, alias = "Folders")]
    pub folders: BTreeMap<String, CacheFolder>,
}

impl CacheFile {
    /// Look up a folder's entry, creating an empty one if it is unseen.
    pub fn folder_mut(&mut self, folder: &str) -> &mut CacheFolder {
        self.folders.entry(folder.to_string()).or_default()
    }

    /// Total number of fingerprints across all folders.
    #[must_use]
    pub fn fingerprint_count(&self) -> usize {
        self.folders.values().map(CacheFolder::len).sum()
    }
}

/// Fingerprints of the images in one folder, keyed by bare filename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFolder {
    /// Filename to 64-bit fingerprint.
    #[serde(default, alias = "ImageHashes")]
    pub image_hashes: BTreeMap<String, u64>,
}

impl CacheFolder {
    /// Number of cached fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.image_hashes.len()
    }

    /// Returns true if no fingerprints are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_hashes.is_empty()
    }

    /// Cached fingerprint for a filename.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.image_hashes.get(name).copied()
    }

    /// Store a fingerprint, replacing any previous value.
    pub fn insert(&mut self, name: String, fingerprint: u64) {
        self.image_hashes.insert(name, fingerprint);
    }

    /// Drop every entry whose filename is not in `present`.
    ///
    /// Names are compared by exact string equality. Returns the number of
    /// entries removed.
    pub fn retain_present(&mut self, present: &[ImageFile]) -> usize {
        let names: HashSet<&str> = present.iter().map(|f| f.name.as_str()).collect();
        let before = self.image_hashes.len();
        self.image_hashes
            .retain(|name, _| names.contains(name.as_str()));
        before - self.image_hashes.len()
    }

    /// Images from `present` that have no cached fingerprint, in input order.
    #[must_use]
    pub fn missing<'a>(&self, present: &'a [ImageFile]) -> Vec<&'a ImageFile> {
        present
            .iter()
            .filter(|f| !self.image_hashes.contains_key(&f.name))
            .collect()
    }
}
