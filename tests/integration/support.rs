//! Shared fixtures: a fingerprinter driven by file contents and a status recorder.

use imagedupe::progress::{ProgressCallback, ScanStatus};
use imagedupe::scanner::{hamming_similarity, Fingerprinter, PerceptualError};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Reads each file as a decimal fingerprint. Pairs listed in the similarity
/// table get that exact score; everything else falls back to bit distance.
#[derive(Default)]
pub struct ContentFingerprinter {
    table: HashMap<(u64, u64), f64>,
    calls: AtomicUsize,
}

impl ContentFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, a: u64, b: u64, score: f64) -> Self {
        self.table.insert((a.min(b), a.max(b)), score);
        self
    }

    /// Number of files fingerprinted so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fingerprinter for ContentFingerprinter {
    fn fingerprint(&self, bytes: &[u8]) -> Result<u64, PerceptualError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or(PerceptualError::HashWidth(bytes.len()))
    }

    fn similarity(&self, a: u64, b: u64) -> f64 {
        self.table
            .get(&(a.min(b), a.max(b)))
            .copied()
            .unwrap_or_else(|| hamming_similarity(a, b))
    }
}

#[derive(Default)]
pub struct StatusRecorder {
    events: Mutex<Vec<ScanStatus>>,
}

impl StatusRecorder {
    pub fn events(&self) -> Vec<ScanStatus> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressCallback for StatusRecorder {
    fn on_status(&self, status: &ScanStatus) {
        self.events.lock().unwrap().push(status.clone());
    }
}

pub fn write_image(dir: &Path, name: &str, fingerprint: u64) {
    fs::write(dir.join(name), fingerprint.to_string()).unwrap();
}
