//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory (or `--config <path>`)
//! 3. `IMAGEDUPE_*` environment variables
//!
//! Command-line flags are applied on top by the caller.

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::scanner::PerceptualAlgorithm;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "IMAGEDUPE_";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum similarity (0–100) for two images to be reported.
    pub threshold: f64,
    /// Fingerprint algorithm.
    pub algorithm: PerceptualAlgorithm,
    /// Fingerprinting thread pool size.
    pub io_threads: usize,
    /// Abort on the first image that cannot be fingerprinted.
    pub strict: bool,
    /// Override for the fingerprint cache location.
    pub cache_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            algorithm: PerceptualAlgorithm::Phash,
            io_threads: 4,
            strict: false,
            cache_path: None,
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults if any source is
    /// malformed.
    ///
    /// `path` replaces the default config file location when given.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load the configuration, reporting parse failures.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the file or environment holds a
    /// value of the wrong type.
    pub fn try_load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.map(Path::to_path_buf).or_else(Self::config_path);
        Self::figment(file.as_deref())
            .extract()
            .map_err(|e| ConfigError::Parse(Box::new(e)))
    }

    /// Build the layered figment for the given config file.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            log::debug!("Reading config from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be between 0 and 100, got {}",
                self.threshold
            )));
        }
        if self.io_threads == 0 {
            return Err(ConfigError::Invalid(
                "io_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "imagedupe", "imagedupe")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
