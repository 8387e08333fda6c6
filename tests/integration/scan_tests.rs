use super::support::{write_image, ContentFingerprinter, StatusRecorder};
use imagedupe::cache::FingerprintStore;
use imagedupe::duplicates::{folder_key, FinderError, ImageMatch, ImageScanner, ScannerConfig};
use imagedupe::progress::{ChannelReporter, ProgressCallback, ScanStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use tempfile::tempdir;

fn scanner(store: Arc<FingerprintStore>, fingerprinter: Arc<ContentFingerprinter>) -> ImageScanner {
    ImageScanner::new(
        ScannerConfig::default()
            .with_store(store)
            .with_fingerprinter(fingerprinter),
    )
}

fn abc_fingerprinter() -> ContentFingerprinter {
    ContentFingerprinter::new()
        .with_score(1, 2, 92.0)
        .with_score(1, 3, 40.0)
        .with_score(2, 3, 38.0)
}

#[test]
fn test_end_to_end_reports_single_pair() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);
    write_image(dir.path(), "b.jpg", 2);
    write_image(dir.path(), "c.jpg", 3);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let scanner = scanner(store, Arc::new(abc_fingerprinter()));

    let (matches, summary) = scanner.process(dir.path(), 80.0).unwrap();

    assert_eq!(matches, vec![ImageMatch::new("a.jpg", "b.jpg", 92.0)]);
    assert_eq!(summary.total_images, 3);
    assert_eq!(summary.fingerprinted, 3);
    assert_eq!(summary.matches, 1);
}

#[test]
fn test_threshold_boundary_is_inclusive() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);
    write_image(dir.path(), "b.jpg", 2);
    let scanner = scanner(
        Arc::new(FingerprintStore::in_memory()),
        Arc::new(abc_fingerprinter()),
    );

    let (at, _) = scanner.process(dir.path(), 92.0).unwrap();
    assert_eq!(at.len(), 1);

    let (above, _) = scanner.process(dir.path(), 93.0).unwrap();
    assert!(above.is_empty());
}

#[test]
fn test_every_pair_reported_once() {
    let dir = tempdir().unwrap();
    for name in ["a.png", "b.png", "c.png", "d.png"] {
        write_image(dir.path(), name, 7);
    }
    let scanner = scanner(
        Arc::new(FingerprintStore::in_memory()),
        Arc::new(ContentFingerprinter::new()),
    );

    let (matches, _) = scanner.process(dir.path(), 100.0).unwrap();

    assert_eq!(matches.len(), 6);
    for m in &matches {
        assert!(m.first < m.second);
        assert_eq!(matches.iter().filter(|o| o.is_pair(&m.first, &m.second)).count(), 1);
    }
}

#[test]
fn test_unsupported_extension_is_ignored() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);
    write_image(dir.path(), "notes.txt", 1);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let fingerprinter = Arc::new(ContentFingerprinter::new());
    let scanner = scanner(store.clone(), fingerprinter.clone());

    let (matches, summary) = scanner.process(dir.path(), 0.0).unwrap();

    assert!(matches.is_empty());
    assert_eq!(summary.total_images, 1);
    assert_eq!(fingerprinter.calls(), 1);
    let cache = store.load().unwrap();
    let folder = &cache.folders[&folder_key(dir.path())];
    assert_eq!(folder.len(), 1);
    assert_eq!(folder.get("a.jpg"), Some(1));
}

#[test]
fn test_missing_folder_touches_nothing() {
    let cache_dir = tempdir().unwrap();
    let cache_path = cache_dir.path().join("imagehashes.json");
    let recorder = Arc::new(StatusRecorder::default());
    let scanner = ImageScanner::new(
        ScannerConfig::default()
            .with_store(Arc::new(FingerprintStore::new(&cache_path)))
            .with_progress_callback(recorder.clone()),
    );

    let missing = cache_dir.path().join("does").join("not").join("exist");
    let (matches, summary) = scanner.process(&missing, 80.0).unwrap();

    assert!(matches.is_empty());
    assert_eq!(summary.total_images, 0);
    assert!(!cache_path.exists());
    assert!(recorder.events().is_empty());
}

#[test]
fn test_subfolders_are_not_visited() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 9);
    let nested = dir.path().join("nested.jpg");
    std::fs::create_dir(&nested).unwrap();
    write_image(&nested, "b.jpg", 9);

    let scanner = scanner(
        Arc::new(FingerprintStore::in_memory()),
        Arc::new(ContentFingerprinter::new()),
    );
    let (matches, summary) = scanner.process(dir.path(), 100.0).unwrap();

    assert!(matches.is_empty());
    assert_eq!(summary.total_images, 1);
}

#[test]
fn test_status_events_reach_channel() {
    let dir = tempdir().unwrap();
    for (i, name) in ["a.jpg", "b.jpg", "c.jpg"].iter().enumerate() {
        write_image(dir.path(), name, i as u64);
    }
    let (tx, rx) = mpsc::channel();
    let scanner = ImageScanner::new(
        ScannerConfig::default()
            .with_fingerprinter(Arc::new(ContentFingerprinter::new()))
            .with_progress_callback(Arc::new(ChannelReporter::new(tx))),
    );

    scanner.process(dir.path(), 80.0).unwrap();
    drop(scanner);

    let lines: Vec<String> = rx.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "Cache loaded",
            "Processing 0001 of 0003",
            "Processing 0002 of 0003",
            "Processing 0003 of 0003",
            "Comparing images",
            "Done",
        ]
    );
}

/// Requests shutdown as soon as the first file has been fingerprinted.
struct StopAfterFirst {
    flag: Arc<AtomicBool>,
}

impl ProgressCallback for StopAfterFirst {
    fn on_status(&self, status: &ScanStatus) {
        if matches!(status, ScanStatus::Processing { .. }) {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_cancelled_scan_writes_no_cache() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_path = cache_dir.path().join("imagehashes.json");
    for i in 0..20 {
        write_image(dir.path(), &format!("img{i:02}.png"), i);
    }

    let flag = Arc::new(AtomicBool::new(false));
    let scanner = ImageScanner::new(
        ScannerConfig::default()
            .with_io_threads(1)
            .with_store(Arc::new(FingerprintStore::new(&cache_path)))
            .with_fingerprinter(Arc::new(ContentFingerprinter::new()))
            .with_shutdown_flag(flag.clone())
            .with_progress_callback(Arc::new(StopAfterFirst { flag })),
    );

    let result = scanner.process(dir.path(), 80.0);

    assert!(matches!(result, Err(FinderError::Interrupted)));
    assert!(!cache_path.exists());
}
