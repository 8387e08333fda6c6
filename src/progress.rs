//! Status reporting for image scans.
//!
//! A scan emits a sequence of [`ScanStatus`] events through a
//! [`ProgressCallback`]. The callback is fire-and-forget: the scanner never
//! waits for an acknowledgement, and marshalling the events onto a UI thread
//! is the receiver's concern.
//!
//! Two implementations are provided:
//!
//! - [`Progress`] draws an indicatif progress bar on the terminal.
//! - [`ChannelReporter`] forwards every event into an `mpsc` channel so a
//!   front end can consume them from another thread.

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// A single status notification emitted during a scan.
///
/// The [`Display`](fmt::Display) form is the human-readable status line,
/// e.g. `Processing 0007 of 0042`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// The fingerprint cache has been loaded.
    CacheLoaded,
    /// A file has been fingerprinted during the addition pass.
    Processing {
        /// 1-based position within the files being fingerprinted
        current: usize,
        /// Number of files being fingerprinted in this scan
        total: usize,
        /// Filename that was just processed
        file: String,
    },
    /// A file could not be fingerprinted and was left out of the scan.
    Skipped {
        /// Filename that was skipped
        file: String,
        /// Why the fingerprint failed
        reason: String,
    },
    /// Reconciliation finished; the pairwise comparison is starting.
    Comparing,
    /// The scan is complete.
    Done,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheLoaded => write!(f, "Cache loaded"),
            Self::Processing { current, total, .. } => {
                write!(f, "Processing {current:04} of {total:04}")
            }
            Self::Skipped { file, reason } => write!(f, "Skipped {file}: {reason}"),
            Self::Comparing => write!(f, "Comparing images"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// Receiver of scan status notifications.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// scanning thread and, during fingerprinting, from rayon worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called for every status event, in emission order.
    fn on_status(&self, status: &ScanStatus);
}

/// Forwards status events into an `mpsc` channel.
///
/// Send errors (the receiver was dropped) are ignored: status reporting is
/// not part of the functional contract of a scan.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<ScanStatus>,
}

impl ChannelReporter {
    /// Create a reporter that sends every event to `sender`.
    #[must_use]
    pub fn new(sender: Sender<ScanStatus>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelReporter {
    fn on_status(&self, status: &ScanStatus) {
        let _ = self.sender.send(status.clone());
    }
}

/// Terminal progress reporter using indicatif.
///
/// Shows a spinner while the cache loads and images are compared, and a bar
/// while new files are fingerprinted.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is drawn.
    ///
    /// # Examples
    ///
    /// ```
    /// use imagedupe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn spinner(&self, message: String) {
        let mut guard = match self.bar.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        *guard = Some(pb);
    }
}

impl ProgressCallback for Progress {
    fn on_status(&self, status: &ScanStatus) {
        if self.quiet {
            return;
        }

        match status {
            ScanStatus::CacheLoaded | ScanStatus::Comparing => self.spinner(status.to_string()),
            ScanStatus::Processing {
                current,
                total,
                file,
            } => {
                let mut guard = match self.bar.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let needs_bar = guard.as_ref().is_none_or(|pb| pb.length().is_none());
                if needs_bar {
                    if let Some(pb) = guard.take() {
                        pb.finish_and_clear();
                    }
                    let pb = ProgressBar::new(*total as u64);
                    pb.set_style(Self::bar_style());
                    *guard = Some(pb);
                }
                if let Some(ref pb) = *guard {
                    pb.set_position(*current as u64);
                    pb.set_message(truncate_name(file, 30));
                }
            }
            ScanStatus::Skipped { .. } => {
                if let Ok(guard) = self.bar.lock() {
                    if let Some(ref pb) = *guard {
                        pb.println(format!("warning: {status}"));
                    }
                }
            }
            ScanStatus::Done => {
                let mut guard = match self.bar.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if let Some(pb) = guard.take() {
                    pb.finish_and_clear();
                }
            }
        }
    }
}

/// Truncate a filename for display in the progress bar.
fn truncate_name(name: &str, max_len: usize) -> String {
    let count = name.chars().count();
    if count <= max_len {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (max_len - 3)).collect();
    format!("...{tail}")
}
