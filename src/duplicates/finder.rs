//! Scan orchestration: cache reconciliation followed by pairwise matching.
//!
//! # Overview
//!
//! [`ImageScanner::process`] runs the whole pipeline for one folder:
//! 1. **Load** - read the fingerprint cache (a bad cache counts as empty)
//! 2. **Remove** - drop cached filenames that are no longer in the folder
//! 3. **Add** - fingerprint supported images that have no cached entry
//! 4. **Persist** - write the cache back if anything was added or removed
//! 5. **Compare** - report every pair at or above the threshold
//!
//! # Example
//!
//! ```no_run
//! use imagedupe::cache::FingerprintStore;
//! use imagedupe::duplicates::{ImageScanner, ScannerConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FingerprintStore::new("/tmp/imagehashes.json"));
//! let scanner = ImageScanner::new(ScannerConfig::default().with_store(store));
//!
//! let (matches, summary) = scanner.process(Path::new("/home/user/Pictures"), 80.0).unwrap();
//! println!("{} matches, {} new fingerprints", matches.len(), summary.fingerprinted);
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use super::matches::{find_matches, ImageMatch};
use crate::cache::{CacheFile, CacheFolder, FingerprintStore};
use crate::progress::{ProgressCallback, ScanStatus};
use crate::scanner::{
    fingerprint_file, FingerprintError, Fingerprinter, ImageFile, PerceptualHasher, ScanError,
    Walker,
};

/// Configuration for an [`ImageScanner`].
#[derive(Clone)]
pub struct ScannerConfig {
    /// Number of threads used to fingerprint new files.
    /// Default is 4 to keep disk access reasonable.
    pub io_threads: usize,
    /// Abort the whole scan on the first file that cannot be fingerprinted.
    pub strict: bool,
    /// Fingerprint store. Without one nothing is cached between scans.
    pub store: Option<Arc<FingerprintStore>>,
    /// Fingerprint and similarity implementation.
    pub fingerprinter: Arc<dyn Fingerprinter>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("io_threads", &self.io_threads)
            .field("strict", &self.strict)
            .field("store", &self.store)
            .field("fingerprinter", &"<fingerprinter>")
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            strict: false,
            store: None,
            fingerprinter: Arc::new(PerceptualHasher::default()),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ScannerConfig {
    /// Set the number of fingerprinting threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Abort on the first unreadable image instead of skipping it.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the fingerprint store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<FingerprintStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the fingerprint implementation.
    #[must_use]
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn notify(&self, status: ScanStatus) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_status(&status);
        }
    }
}

/// A file left out of the scan because it could not be fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    /// Filename within the scanned folder
    pub name: String,
    /// Why fingerprinting failed
    pub reason: String,
}

/// Statistics and warnings from one scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Folder that was scanned
    pub folder: PathBuf,
    /// Whether the folder existed
    pub folder_found: bool,
    /// Supported images found in the folder
    pub total_images: usize,
    /// Images whose fingerprint came from the cache
    pub cache_hits: usize,
    /// Images fingerprinted during this scan
    pub fingerprinted: usize,
    /// Stale cache entries removed
    pub removed: usize,
    /// Images that could not be fingerprinted
    pub skipped: Vec<SkippedFile>,
    /// Whether the folder's cache entry changed during reconciliation
    pub cache_changed: bool,
    /// Whether the updated cache was written successfully
    pub cache_saved: bool,
    /// Non-fatal cache problems (unreadable, corrupted or unwritable cache)
    pub cache_warnings: Vec<String>,
    /// Number of matching pairs
    pub matches: usize,
    /// Duration of the entire scan
    #[serde(skip)]
    pub scan_duration: Duration,
}

impl ScanSummary {
    fn new(folder: &Path) -> Self {
        Self {
            folder: folder.to_path_buf(),
            ..Default::default()
        }
    }

    /// True if the scan completed but had to degrade (skipped files or
    /// cache problems).
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.skipped.is_empty() || !self.cache_warnings.is_empty()
    }
}

/// Errors that can occur during a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The threshold is not a number.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(f64),

    /// The folder could not be listed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// An image could not be fingerprinted in strict mode.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

/// Scanner that reconciles the fingerprint cache and finds similar images.
///
/// # Example
///
/// ```no_run
/// use imagedupe::duplicates::ImageScanner;
/// use std::path::Path;
///
/// let scanner = ImageScanner::with_defaults();
/// match scanner.process(Path::new("."), 80.0) {
///     Ok((matches, _)) => {
///         for m in matches {
///             println!("{:.1}% {} {}", m.similarity, m.first, m.second);
///         }
///     }
///     Err(e) => eprintln!("Scan failed: {}", e),
/// }
/// ```
pub struct ImageScanner {
    config: ScannerConfig,
}

impl ImageScanner {
    /// Create a new scanner with the given configuration.
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Create a new scanner with default configuration (no persistent cache).
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ScannerConfig::default())
    }

    /// Scan `folder` and return every pair of images at or above `threshold`.
    ///
    /// A folder that does not exist yields no matches and leaves the cache
    /// untouched. Finding no matches is not an error.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path exists but is not a directory
    /// - The folder cannot be listed
    /// - An image cannot be fingerprinted and strict mode is on
    /// - The scan is interrupted by shutdown signal
    pub fn process(
        &self,
        folder: &Path,
        threshold: f64,
    ) -> Result<(Vec<ImageMatch>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if threshold.is_nan() {
            return Err(FinderError::InvalidThreshold(threshold));
        }

        if !folder.exists() {
            log::info!("Folder {} does not exist, nothing to scan", folder.display());
            return Ok((Vec::new(), ScanSummary::new(folder)));
        }

        let (table, mut summary) = self.reconcile(folder)?;

        self.config.notify(ScanStatus::Comparing);
        let matches = find_matches(
            &table.image_hashes,
            threshold,
            self.config.fingerprinter.as_ref(),
        );
        summary.matches = matches.len();
        summary.scan_duration = start_time.elapsed();
        self.config.notify(ScanStatus::Done);

        log::info!(
            "Scanned {}: {} images, {} fingerprinted, {} matches in {:.2?}",
            folder.display(),
            summary.total_images,
            summary.fingerprinted,
            summary.matches,
            summary.scan_duration
        );

        Ok((matches, summary))
    }

    /// Bring the cached fingerprint table for `folder` in line with the
    /// folder's current contents and persist it if it changed.
    ///
    /// The folder must exist.
    ///
    /// # Errors
    ///
    /// See [`process`](Self::process). The cache is never written when an
    /// error is returned.
    pub fn reconcile(&self, folder: &Path) -> Result<(CacheFolder, ScanSummary), FinderError> {
        if !folder.is_dir() {
            return Err(FinderError::NotADirectory(folder.to_path_buf()));
        }
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let mut summary = ScanSummary::new(folder);
        summary.folder_found = true;
        let key = folder_key(folder);

        let mut cache = self.load_cache(&mut summary);
        let mut table = cache.folders.remove(&key).unwrap_or_default();
        self.config.notify(ScanStatus::CacheLoaded);

        let images = Walker::new(folder).list_images()?;
        summary.total_images = images.len();

        summary.removed = table.retain_present(&images);
        if summary.removed > 0 {
            log::debug!("Removed {} stale cache entries", summary.removed);
        }

        let pending = table.missing(&images);
        summary.cache_hits = images.len() - pending.len();

        if !pending.is_empty() {
            log::info!("Fingerprinting {} new images", pending.len());
            let results = self.fingerprint_pending(&pending);

            if self.config.is_shutdown_requested() {
                log::info!("Fingerprinting interrupted by shutdown signal");
                return Err(FinderError::Interrupted);
            }

            for (image, result) in pending.iter().zip(results) {
                match result {
                    Some(Ok(fingerprint)) => {
                        table.insert(image.name.clone(), fingerprint);
                        summary.fingerprinted += 1;
                    }
                    Some(Err(e)) if self.config.strict => return Err(e.into()),
                    Some(Err(e)) => {
                        log::warn!("Skipping {}: {}", image.name, e);
                        let reason = error_reason(&e);
                        self.config.notify(ScanStatus::Skipped {
                            file: image.name.clone(),
                            reason: reason.clone(),
                        });
                        summary.skipped.push(SkippedFile {
                            name: image.name.clone(),
                            reason,
                        });
                    }
                    // Only left unprocessed behind an earlier strict-mode failure.
                    None => {}
                }
            }
        }

        let load_failed = !summary.cache_warnings.is_empty();
        summary.cache_changed = summary.removed > 0 || summary.fingerprinted > 0;

        if summary.cache_changed || load_failed {
            self.persist(&key, &table, &mut summary);
        }

        Ok((table, summary))
    }

    fn load_cache(&self, summary: &mut ScanSummary) -> CacheFile {
        let Some(ref store) = self.config.store else {
            return CacheFile::default();
        };
        let (cache, warning) = store.load_or_default();
        if let Some(e) = warning {
            summary.cache_warnings.push(e.to_string());
        }
        cache
    }

    fn persist(&self, key: &str, table: &CacheFolder, summary: &mut ScanSummary) {
        let Some(ref store) = self.config.store else {
            return;
        };
        match store.save_folder(key, table) {
            Ok(()) => summary.cache_saved = true,
            Err(e) => {
                log::warn!("Failed to save fingerprint cache: {}", e);
                summary.cache_warnings.push(e.to_string());
            }
        }
    }

    /// Fingerprint `pending` on a bounded pool, returning one slot per input.
    ///
    /// A slot is `None` when the file was not attempted: either shutdown was
    /// requested or, in strict mode, an earlier file (in input order) failed.
    fn fingerprint_pending(
        &self,
        pending: &[&ImageFile],
    ) -> Vec<Option<Result<u64, FingerprintError>>> {
        let total = pending.len();
        let processed = Mutex::new(0usize);
        let first_failure = AtomicUsize::new(usize::MAX);
        let config = &self.config;

        let work = || {
            pending
                .par_iter()
                .enumerate()
                .map(|(idx, image)| {
                    if config.is_shutdown_requested() {
                        return None;
                    }
                    if config.strict && idx > first_failure.load(Ordering::SeqCst) {
                        return None;
                    }

                    log::trace!("Fingerprinting {}", image.path.display());
                    let result = fingerprint_file(config.fingerprinter.as_ref(), image);
                    if result.is_err() && config.strict {
                        first_failure.fetch_min(idx, Ordering::SeqCst);
                    }

                    // Counting and reporting under one lock keeps the counter monotonic.
                    let mut done = processed
                        .lock()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                    *done += 1;
                    config.notify(ScanStatus::Processing {
                        current: *done,
                        total,
                        file: image.name.clone(),
                    });

                    Some(result)
                })
                .collect::<Vec<_>>()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.io_threads.max(1))
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!(
                    "Failed to create fingerprint thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                work()
            }
        }
    }
}

/// Cache key for a folder: its absolute path as a string.
#[must_use]
pub fn folder_key(folder: &Path) -> String {
    std::path::absolute(folder)
        .unwrap_or_else(|_| folder.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn error_reason(err: &FingerprintError) -> String {
    match err {
        FingerprintError::Read { source, .. } => source.to_string(),
        FingerprintError::Decode { source, .. } => source.to_string(),
    }
}
