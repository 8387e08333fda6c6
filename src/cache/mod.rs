//! Fingerprint caching module for imagedupe.
//!
//! This module persists image fingerprints per folder so that subsequent
//! scans only fingerprint files that were added since the last run.
//!
//! # Architecture
//!
//! The caching system is split into two main components:
//!
//! * [`store`]: JSON file persistence with atomic snapshot writes.
//! * [`entry`]: The serialized cache layout and its reconciliation helpers.
//!
//! # Cache Invalidation
//!
//! Entries are keyed by folder path and bare filename only. A cached
//! fingerprint is dropped when its file disappears from the folder; a file
//! that is replaced in place under the same name keeps its old fingerprint
//! until it is removed from the cache (for example with `cache clear`).

pub mod entry;
pub mod store;

pub use entry::{CacheFile, CacheFolder};
pub use store::{
    algorithm_path, cache_file_name, CacheError, CacheResult, FingerprintStore,
    CACHE_FILE_NAME,
};
