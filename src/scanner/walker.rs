//! Single-level folder listing filtered to supported image files.
//!
//! # Overview
//!
//! The [`Walker`] enumerates the direct children of one folder (no
//! recursion), keeps regular files whose names carry a supported image
//! extension, and returns them sorted by filename so that every later pass
//! sees a deterministic order.
//!
//! # Example
//!
//! ```no_run
//! use imagedupe::scanner::Walker;
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"));
//! for image in walker.list_images().unwrap() {
//!     println!("{}", image.name);
//! }
//! ```

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{ImageFile, ScanError};

/// File extensions (lowercase, without the dot) treated as images.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "bmp", "tga", "webp"];

/// Check whether a filename has a supported image extension.
///
/// The comparison is case-insensitive and looks only at the end of the name,
/// so `.JPG`, `photo.Jpeg` and `scan.webp` all qualify.
///
/// # Example
///
/// ```
/// use imagedupe::scanner::is_supported_image;
///
/// assert!(is_supported_image("IMG_0001.JPG"));
/// assert!(!is_supported_image("notes.txt"));
/// ```
#[must_use]
pub fn is_supported_image(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// Lists the supported images directly inside one folder.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    /// Create a walker for the given folder.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Enumerate supported images in the folder, sorted by filename.
    ///
    /// Symbolic links to files are followed. Entries that cannot be inspected
    /// (for example dangling links) are skipped with a warning, and names
    /// that are not valid UTF-8 are skipped because they cannot be used as
    /// cache keys.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the folder itself cannot be read.
    pub fn list_images(&self) -> Result<Vec<ImageFile>, ScanError> {
        let walk = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut images = Vec::new();

        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.depth() == 0 {
                        return Err(self.root_error(err));
                    }
                    log::warn!(
                        "Skipping unreadable entry {}: {}",
                        err.path().map_or_else(String::new, |p| p.display().to_string()),
                        err
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                log::warn!(
                    "Skipping file with non UTF-8 name: {}",
                    entry.path().display()
                );
                continue;
            };

            if !is_supported_image(name) {
                log::trace!("Ignoring unsupported file: {}", name);
                continue;
            }

            images.push(ImageFile::new(name.to_string(), entry.path().to_path_buf()));
        }

        log::debug!(
            "Found {} supported images in {}",
            images.len(),
            self.root.display()
        );
        Ok(images)
    }

    fn root_error(&self, err: walkdir::Error) -> ScanError {
        let path = self.root.clone();
        match err.into_io_error() {
            Some(io) if io.kind() == std::io::ErrorKind::NotFound => ScanError::NotFound(path),
            Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                ScanError::PermissionDenied(path)
            }
            Some(io) => ScanError::Io { path, source: io },
            None => ScanError::Io {
                path,
                source: std::io::Error::other("filesystem loop detected"),
            },
        }
    }
}
