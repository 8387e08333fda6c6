//! JSON-file-backed fingerprint store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use thiserror::Error;

use super::entry::{CacheFile, CacheFolder};
use crate::scanner::PerceptualAlgorithm;

/// Filename of the cache used by the default algorithm.
pub const CACHE_FILE_NAME: &str = "imagehashes.json";

/// Errors raised by the fingerprint store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but could not be read.
    #[error("Failed to read cache file {path}: {source}")]
    Read {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not valid cache JSON.
    #[error("Cache file {path} is corrupted: {source}")]
    Corrupt {
        /// Cache file path
        path: PathBuf,
        /// The parse error
        #[source]
        source: serde_json::Error,
    },

    /// The cache file could not be written.
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache could not be serialized.
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No per-user cache directory could be determined.
    #[error("Failed to determine project directories")]
    NoCacheDir,
}

/// Result alias for store operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
enum Backend {
    File(PathBuf),
    Memory(Mutex<CacheFile>),
}

/// Persistent store for per-folder fingerprint tables.
///
/// Every save writes the complete cache to a temporary file next to the
/// target and renames it into place, so a crash never leaves a truncated
/// cache behind. Within a process, [`save_folder`](Self::save_folder)
/// serialises its read-merge-write cycle on an internal lock so concurrent
/// scans of different folders do not discard each other's updates.
#[derive(Debug)]
pub struct FingerprintStore {
    backend: Backend,
    write_lock: Mutex<()>,
}

impl FingerprintStore {
    /// Create a store backed by the JSON file at `path`.
    ///
    /// The file does not need to exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::File(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a store that lives only in memory.
    ///
    /// Nothing is read from or written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(CacheFile::default())),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the store at the default per-user location for `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoCacheDir`] if the platform has no home
    /// directory to derive a cache location from.
    pub fn open_default(algorithm: PerceptualAlgorithm) -> CacheResult<Self> {
        Ok(Self::new(Self::default_path(algorithm)?))
    }

    /// Default cache file path for `algorithm`.
    ///
    /// pHash uses `imagehashes.json`; other algorithms get their own file
    /// because their fingerprints are not comparable.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoCacheDir`] if no cache directory is available.
    pub fn default_path(algorithm: PerceptualAlgorithm) -> CacheResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "imagedupe", "imagedupe").ok_or(CacheError::NoCacheDir)?;
        Ok(dirs.cache_dir().join(cache_file_name(algorithm)))
    }

    /// Path of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::File(path) => Some(path),
            Backend::Memory(_) => None,
        }
    }

    /// Load the entire cache.
    ///
    /// A missing file is an empty cache, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] if the file exists but cannot be read and
    /// [`CacheError::Corrupt`] if it does not parse.
    pub fn load(&self) -> CacheResult<CacheFile> {
        let path = match &self.backend {
            Backend::File(path) => path,
            Backend::Memory(cache) => return Ok(lock(cache).clone()),
        };

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No cache file at {}, starting empty", path.display());
                return Ok(CacheFile::default());
            }
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.clone(),
                    source,
                })
            }
        };

        let cache: CacheFile =
            serde_json::from_slice(&content).map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;
        log::debug!(
            "Loaded cache {} ({} folders, {} fingerprints)",
            path.display(),
            cache.folders.len(),
            cache.fingerprint_count()
        );
        Ok(cache)
    }

    /// Load the cache, treating an unreadable or corrupted file as empty.
    ///
    /// The cache is only an optimisation, so a bad file is rebuilt rather
    /// than failing the scan. The error, if any, is returned alongside the
    /// empty cache so callers can surface it.
    pub fn load_or_default(&self) -> (CacheFile, Option<CacheError>) {
        match self.load() {
            Ok(cache) => (cache, None),
            Err(e) => {
                log::warn!("{}; rebuilding the cache from scratch", e);
                (CacheFile::default(), Some(e))
            }
        }
    }

    /// Replace the persisted cache with `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`] if the file or its directory cannot be
    /// written.
    pub fn save(&self, cache: &CacheFile) -> CacheResult<()> {
        let _guard = lock(&self.write_lock);
        self.write_snapshot(cache)
    }

    fn write_snapshot(&self, cache: &CacheFile) -> CacheResult<()> {
        let path = match &self.backend {
            Backend::File(path) => path,
            Backend::Memory(stored) => {
                *lock(stored) = cache.clone();
                return Ok(());
            }
        };

        let json = serde_json::to_string(cache)?;
        write_atomic(path, json.as_bytes()).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        log::debug!(
            "Saved cache {} ({} folders, {} fingerprints)",
            path.display(),
            cache.folders.len(),
            cache.fingerprint_count()
        );
        Ok(())
    }

    /// Persist one folder's table, keeping every other folder as currently
    /// stored.
    ///
    /// The latest cache is re-read under the store lock and only `folder` is
    /// replaced before the snapshot is written back. A corrupted file is
    /// replaced by a snapshot holding just this folder.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Read`] without writing if the existing file
    /// cannot be read, and [`CacheError::Write`] if the snapshot cannot be
    /// written.
    pub fn save_folder(&self, folder: &str, entry: &CacheFolder) -> CacheResult<()> {
        let _guard = lock(&self.write_lock);
        let mut cache = match self.load() {
            Ok(cache) => cache,
            // Already reported by the scan's own load.
            Err(CacheError::Corrupt { .. }) => CacheFile::default(),
            Err(e) => return Err(e),
        };
        cache.folders.insert(folder.to_string(), entry.clone());
        self.write_snapshot(&cache)
    }

    /// Remove one folder from the cache.
    ///
    /// Returns true if the folder was present.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] if the cache cannot be loaded or written.
    pub fn remove_folder(&self, folder: &str) -> CacheResult<bool> {
        let _guard = lock(&self.write_lock);
        let mut cache = self.load()?;
        if cache.folders.remove(folder).is_none() {
            return Ok(false);
        }
        self.write_snapshot(&cache)?;
        Ok(true)
    }

    /// Delete the whole cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Write`] if the file exists but cannot be removed.
    pub fn clear(&self) -> CacheResult<()> {
        let _guard = lock(&self.write_lock);
        match &self.backend {
            Backend::File(path) => match fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(CacheError::Write {
                    path: path.clone(),
                    source,
                }),
            },
            Backend::Memory(cache) => {
                *lock(cache) = CacheFile::default();
                Ok(())
            }
        }
    }
}

/// Cache filename used for `algorithm`.
#[must_use]
pub fn cache_file_name(algorithm: PerceptualAlgorithm) -> String {
    match algorithm {
        PerceptualAlgorithm::Phash => CACHE_FILE_NAME.to_string(),
        other => format!("imagehashes-{}.json", other.id()),
    }
}

/// Cache file for `algorithm` next to the pHash cache at `path`.
///
/// pHash uses `path` itself. Other algorithms insert their name before the
/// extension, so `hashes.json` becomes `hashes-dhash.json`.
#[must_use]
pub fn algorithm_path(path: &Path, algorithm: PerceptualAlgorithm) -> PathBuf {
    if algorithm == PerceptualAlgorithm::Phash {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map_or_else(|| "imagehashes".into(), |s| s.to_string_lossy());
    let file_name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, algorithm.id(), ext.to_string_lossy()),
        None => format!("{}-{}", stem, algorithm.id()),
    };
    path.with_file_name(file_name)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Write `contents` to a sibling temp file, fsync it, and rename it over `path`.
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CACHE_FILE_NAME.to_string());
    let temp_path = path.with_file_name(format!("{}.{}.tmp", file_name, std::process::id()));

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
