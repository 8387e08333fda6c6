use clap::Parser;
use imagedupe::cache::FingerprintStore;
use imagedupe::cli::Cli;
use imagedupe::error::ExitCode;
use imagedupe::run_app;
use imagedupe::scanner::{Fingerprinter, PerceptualAlgorithm, PerceptualHasher};
use std::path::Path;
use tempfile::tempdir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["imagedupe", "-q", "--no-color"];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

fn save_gradient(path: &Path, flip: bool) {
    image::RgbImage::from_fn(64, 64, |x, y| {
        let v = (if flip { 255 - x * 4 } else { x * 4 }) as u8;
        image::Rgb([v, (y * 4) as u8, 128])
    })
    .save(path)
    .unwrap();
}

#[test]
fn test_scan_with_matches_exits_success() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("imagehashes.json");
    save_gradient(&dir.path().join("a.png"), false);
    save_gradient(&dir.path().join("copy.png"), false);

    let code = run(&[
        "scan",
        dir.path().to_str().unwrap(),
        "--cache",
        cache.to_str().unwrap(),
        "--output",
        "json",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(FingerprintStore::new(&cache).load().unwrap().fingerprint_count(), 2);
}

fn stored_fingerprint(cache: &Path, name: &str) -> u64 {
    let cache = FingerprintStore::new(cache).load().unwrap();
    assert_eq!(cache.folders.len(), 1);
    cache.folders.values().next().unwrap().image_hashes[name]
}

#[test]
fn test_algorithms_do_not_share_an_explicit_cache_file() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("shared.json");
    let image = dir.path().join("a.png");
    save_gradient(&image, false);
    let bytes = std::fs::read(&image).unwrap();

    let folder = dir.path().to_str().unwrap();
    let cache_arg = cache.to_str().unwrap();
    run(&["scan", folder, "--cache", cache_arg, "--algorithm", "phash"]).unwrap();
    run(&["scan", folder, "--cache", cache_arg, "--algorithm", "dhash"]).unwrap();

    let phash = PerceptualHasher::new(PerceptualAlgorithm::Phash)
        .fingerprint(&bytes)
        .unwrap();
    let dhash = PerceptualHasher::new(PerceptualAlgorithm::Dhash)
        .fingerprint(&bytes)
        .unwrap();
    assert_eq!(stored_fingerprint(&cache, "a.png"), phash);
    assert_eq!(
        stored_fingerprint(&cache_dir.path().join("shared-dhash.json"), "a.png"),
        dhash
    );
}

#[test]
fn test_scan_without_images_exits_no_matches() {
    let dir = tempdir().unwrap();
    let code = run(&["scan", dir.path().to_str().unwrap(), "--no-cache"]).unwrap();
    assert_eq!(code, ExitCode::NoMatches);
}

#[test]
fn test_scan_with_broken_image_is_partial() {
    let dir = tempdir().unwrap();
    save_gradient(&dir.path().join("a.png"), false);
    std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

    let code = run(&[
        "scan",
        dir.path().to_str().unwrap(),
        "--no-cache",
        "--output",
        "csv",
    ])
    .unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_strict_scan_with_broken_image_fails() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

    let err = run(&["scan", dir.path().to_str().unwrap(), "--no-cache", "--strict"]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("broken.jpg"));
}

#[test]
fn test_cache_clear_folder() {
    let dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let cache = cache_dir.path().join("imagehashes.json");
    save_gradient(&dir.path().join("a.png"), false);
    save_gradient(&dir.path().join("b.png"), true);

    let folder = dir.path().to_str().unwrap();
    let cache_arg = cache.to_str().unwrap();
    run(&["scan", folder, "--cache", cache_arg]).unwrap();
    assert_eq!(FingerprintStore::new(&cache).load().unwrap().folders.len(), 1);

    let code = run(&["cache", "clear", folder, "--cache", cache_arg]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(FingerprintStore::new(&cache).load().unwrap().folders.is_empty());

    run(&["cache", "stats", "--cache", cache_arg]).unwrap();
    run(&["cache", "clear", "--cache", cache_arg]).unwrap();
    assert!(!cache.exists());
}
