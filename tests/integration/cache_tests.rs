use super::support::{write_image, ContentFingerprinter};
use imagedupe::cache::FingerprintStore;
use imagedupe::duplicates::{folder_key, ImageScanner, ScannerConfig};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn scanner_for(
    store: &Arc<FingerprintStore>,
    fingerprinter: &Arc<ContentFingerprinter>,
) -> ImageScanner {
    ImageScanner::new(
        ScannerConfig::default()
            .with_store(store.clone())
            .with_fingerprinter(fingerprinter.clone()),
    )
}

#[test]
fn test_rescan_is_idempotent() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 0b1111);
    write_image(dir.path(), "b.jpg", 0b0111);
    write_image(dir.path(), "c.jpg", u64::MAX);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let fingerprinter = Arc::new(ContentFingerprinter::new());
    let scanner = scanner_for(&store, &fingerprinter);

    let (first, summary) = scanner.process(dir.path(), 90.0).unwrap();
    assert_eq!(summary.fingerprinted, 3);
    assert_eq!(fingerprinter.calls(), 3);
    let saved = fs::read_to_string(store.path().unwrap()).unwrap();

    let (second, summary) = scanner.process(dir.path(), 90.0).unwrap();
    assert_eq!(summary.fingerprinted, 0);
    assert_eq!(summary.cache_hits, 3);
    assert!(!summary.cache_changed);
    assert_eq!(fingerprinter.calls(), 3);
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(store.path().unwrap()).unwrap(), saved);
}

#[test]
fn test_removed_file_is_evicted() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);
    write_image(dir.path(), "b.jpg", 2);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let scanner = scanner_for(&store, &Arc::new(ContentFingerprinter::new()));
    scanner.process(dir.path(), 80.0).unwrap();

    fs::remove_file(dir.path().join("b.jpg")).unwrap();
    let (_, summary) = scanner.process(dir.path(), 80.0).unwrap();

    assert_eq!(summary.removed, 1);
    assert!(summary.cache_saved);
    let cache = store.load().unwrap();
    let folder = &cache.folders[&folder_key(dir.path())];
    assert_eq!(folder.get("a.jpg"), Some(1));
    assert_eq!(folder.get("b.jpg"), None);
}

#[test]
fn test_new_file_is_fingerprinted_once() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);
    write_image(dir.path(), "b.jpg", 2);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let fingerprinter = Arc::new(ContentFingerprinter::new());
    let scanner = scanner_for(&store, &fingerprinter);
    scanner.process(dir.path(), 80.0).unwrap();
    assert_eq!(fingerprinter.calls(), 2);

    write_image(dir.path(), "c.jpg", 3);
    let (_, summary) = scanner.process(dir.path(), 80.0).unwrap();

    assert_eq!(summary.fingerprinted, 1);
    assert_eq!(summary.cache_hits, 2);
    assert_eq!(fingerprinter.calls(), 3);
    let cache = store.load().unwrap();
    let folder = &cache.folders[&folder_key(dir.path())];
    assert_eq!(folder.len(), 3);
    assert_eq!(folder.get("c.jpg"), Some(3));
}

#[test]
fn test_replaced_file_keeps_cached_fingerprint() {
    let dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);

    let store = Arc::new(FingerprintStore::in_memory());
    let scanner = scanner_for(&store, &Arc::new(ContentFingerprinter::new()));
    scanner.process(dir.path(), 80.0).unwrap();

    write_image(dir.path(), "a.jpg", 99);
    let (table, _) = scanner.reconcile(dir.path()).unwrap();

    assert_eq!(table.get("a.jpg"), Some(1));
}

#[test]
fn test_folders_share_one_cache_file() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(first.path(), "a.jpg", 1);
    write_image(second.path(), "x.png", 2);
    write_image(second.path(), "y.png", 3);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let scanner = scanner_for(&store, &Arc::new(ContentFingerprinter::new()));
    scanner.process(first.path(), 80.0).unwrap();
    scanner.process(second.path(), 80.0).unwrap();

    let cache = store.load().unwrap();
    assert_eq!(cache.folders.len(), 2);
    assert_eq!(cache.folders[&folder_key(first.path())].len(), 1);
    assert_eq!(cache.folders[&folder_key(second.path())].len(), 2);
    assert_eq!(cache.fingerprint_count(), 3);
}

#[test]
fn test_concurrent_scans_keep_each_folder() {
    let cache_dir = tempdir().unwrap();
    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    let fingerprinter = Arc::new(ContentFingerprinter::new());
    let folders: Vec<_> = (0..4)
        .map(|i| {
            let dir = tempdir().unwrap();
            write_image(dir.path(), "a.jpg", i);
            dir
        })
        .collect();

    std::thread::scope(|s| {
        for dir in &folders {
            let scanner = scanner_for(&store, &fingerprinter);
            s.spawn(move || scanner.process(dir.path(), 80.0).unwrap());
        }
    });

    let cache = store.load().unwrap();
    assert_eq!(cache.folders.len(), 4);
    for dir in &folders {
        assert!(cache.folders.contains_key(&folder_key(dir.path())));
    }
}

#[test]
fn test_cache_file_uses_camel_case_keys() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache_path = cache_dir.path().join("imagehashes.json");
    write_image(dir.path(), "a.jpg", 42);

    let store = Arc::new(FingerprintStore::new(&cache_path));
    scanner_for(&store, &Arc::new(ContentFingerprinter::new()))
        .process(dir.path(), 80.0)
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&cache_path).unwrap()).unwrap();
    let key = folder_key(dir.path());
    assert_eq!(value["folders"][key.as_str()]["imageHashes"]["a.jpg"], 42);
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    write_image(dir.path(), "a.jpg", 1);

    let store = Arc::new(FingerprintStore::new(cache_dir.path().join("imagehashes.json")));
    scanner_for(&store, &Arc::new(ContentFingerprinter::new()))
        .process(dir.path(), 80.0)
        .unwrap();

    let names: Vec<_> = fs::read_dir(cache_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["imagehashes.json".to_string()]);
}
