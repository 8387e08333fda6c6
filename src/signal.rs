//! Ctrl+C handling.
//!
//! A single process-wide `ctrlc` hook sets a shared [`AtomicBool`]. The
//! scanner checks that flag before fingerprinting each file and abandons the
//! scan, without writing the cache, once it is set.
//!
//! ```rust,no_run
//! use imagedupe::duplicates::ScannerConfig;
//! use imagedupe::signal::install_handler;
//!
//! let handler = install_handler().unwrap();
//! let config = ScannerConfig::default().with_shutdown_flag(handler.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler that is not hooked to any signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag by hand.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag to hand to the scanner.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the Ctrl+C hook, or reuse the one installed earlier in this
/// process with its flag cleared.
///
/// # Errors
///
/// Returns [`SignalError`] if the platform refuses the hook.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.flag();
    let result = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Stopping scan...");
        let _ = stderr.flush();
        log::info!("Shutdown signal received");
    });

    match result {
        Ok(()) => Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone()),
        // Another thread won the race to register; share its handler.
        Err(ctrlc::Error::MultipleHandlers) => match GLOBAL_HANDLER.get() {
            Some(existing) => Ok(existing.clone()),
            None => {
                log::debug!("Ctrl+C already hooked elsewhere, using an unhooked flag");
                Ok(GLOBAL_HANDLER.get_or_init(ShutdownHandler::new).clone())
            }
        },
        Err(e) => Err(e.into()),
    }
}
