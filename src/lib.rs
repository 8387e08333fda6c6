//! imagedupe - Similar Image Finder
//!
//! Finds visually similar images in a folder using 64-bit perceptual
//! fingerprints. Fingerprints are cached per folder so a rescan only hashes
//! files that were added since the previous run.

pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::cache::{algorithm_path, FingerprintStore};
use crate::cli::{CacheArgs, CacheCommand, Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{folder_key, sort_by_similarity, ImageScanner, ScannerConfig};
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::PerceptualHasher;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the scan fails or the
/// results cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Scan(args) => handle_scan(args, config, cli.quiet),
        Commands::Cache(command) => handle_cache(command, &config),
    }
}

fn handle_scan(args: ScanArgs, mut config: Config, quiet: bool) -> anyhow::Result<ExitCode> {
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(threads) = args.io_threads {
        config.io_threads = usize::from(threads);
    }
    if args.cache.is_some() {
        config.cache_path = args.cache.clone();
    }
    config.strict |= args.strict;
    config.validate()?;

    let folder = resolve_folder(&args.folder);
    log::info!(
        "Scanning {} with {} (threshold {})",
        folder.display(),
        config.algorithm,
        config.threshold
    );

    let store = if args.no_cache {
        FingerprintStore::in_memory()
    } else {
        open_store(config.cache_path.clone(), &config)?
    };
    if let Some(path) = store.path() {
        log::debug!("Using fingerprint cache {}", path.display());
    }

    let handler = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    let scanner_config = ScannerConfig::default()
        .with_io_threads(config.io_threads)
        .with_strict(config.strict)
        .with_store(Arc::new(store))
        .with_fingerprinter(Arc::new(PerceptualHasher::new(config.algorithm)))
        .with_shutdown_flag(handler.flag())
        .with_progress_callback(Arc::new(Progress::new(quiet)));

    let scanner = ImageScanner::new(scanner_config);
    let (mut matches, summary) = scanner
        .process(&folder, config.threshold)
        .with_context(|| format!("Failed to scan {}", folder.display()))?;
    sort_by_similarity(&mut matches);

    let exit_code = if summary.has_warnings() {
        ExitCode::PartialSuccess
    } else if matches.is_empty() {
        ExitCode::NoMatches
    } else {
        ExitCode::Success
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&matches, &summary).write_to(&mut out)?,
        OutputFormat::Json => {
            JsonOutput::new(&matches, &summary, config.threshold, exit_code)
                .write_to(&mut out, true)?;
        }
        OutputFormat::Csv => CsvOutput::new(&summary.folder, &matches).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

fn handle_cache(command: CacheCommand, config: &Config) -> anyhow::Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        CacheCommand::Path(args) => {
            let path = cache_path_for(&args, config)?;
            writeln!(out, "{}", path.display())?;
        }
        CacheCommand::Clear { folder, args } => {
            let store = FingerprintStore::new(cache_path_for(&args, config)?);
            match folder {
                Some(folder) => {
                    let key = folder_key(&resolve_folder(&folder));
                    if store.remove_folder(&key)? {
                        writeln!(out, "Removed cached fingerprints for {key}")?;
                    } else {
                        writeln!(out, "No cached fingerprints for {key}")?;
                    }
                }
                None => {
                    store.clear()?;
                    writeln!(out, "Fingerprint cache cleared")?;
                }
            }
        }
        CacheCommand::Stats(args) => {
            let path = cache_path_for(&args, config)?;
            let cache = FingerprintStore::new(&path)
                .load()
                .with_context(|| format!("Failed to read {}", path.display()))?;
            for (folder, entry) in &cache.folders {
                writeln!(out, "{:>8}  {}", entry.len(), folder)?;
            }
            writeln!(
                out,
                "{} fingerprints in {} folders ({})",
                cache.fingerprint_count(),
                cache.folders.len(),
                path.display()
            )?;
        }
    }

    Ok(ExitCode::Success)
}

fn open_store(path: Option<PathBuf>, config: &Config) -> anyhow::Result<FingerprintStore> {
    match path {
        Some(path) => Ok(FingerprintStore::new(algorithm_path(&path, config.algorithm))),
        None => match FingerprintStore::open_default(config.algorithm) {
            Ok(store) => Ok(store),
            Err(e) => {
                log::warn!("{}; fingerprints will not be cached", e);
                Ok(FingerprintStore::in_memory())
            }
        },
    }
}

fn cache_path_for(args: &CacheArgs, config: &Config) -> anyhow::Result<PathBuf> {
    let algorithm = args.algorithm.unwrap_or(config.algorithm);
    match args.cache.as_ref().or(config.cache_path.as_ref()) {
        Some(path) => Ok(algorithm_path(path, algorithm)),
        None => Ok(FingerprintStore::default_path(algorithm)?),
    }
}

/// Canonicalize a folder argument so that the same folder always maps to
/// the same cache key. Folders that do not exist are made absolute instead.
fn resolve_folder(folder: &Path) -> PathBuf {
    folder
        .canonicalize()
        .or_else(|_| std::path::absolute(folder))
        .unwrap_or_else(|_| folder.to_path_buf())
}
