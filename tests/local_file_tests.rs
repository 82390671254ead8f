//! End-to-end tests of the range cache over real files on disk.

use fresh_lines::{EngineConfig, LineRange, LocalLineSource, RangeCache};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn big_file(dir: &TempDir, lines: usize) -> PathBuf {
    let path = dir.path().join("big.txt");
    let content: String = (0..lines).map(|i| format!("{i:08} lorem ipsum\n")).collect();
    std::fs::write(&path, content).unwrap();
    path
}

fn local_cache(chunk_size: usize) -> RangeCache {
    let config = EngineConfig {
        chunk_size,
        ..EngineConfig::default()
    };
    RangeCache::new(Arc::new(LocalLineSource::new()), config)
}

#[tokio::test]
async fn test_scroll_through_large_file() {
    let dir = TempDir::new().unwrap();
    let path = big_file(&dir, 50_000);
    let cache = local_cache(500);

    cache.open(&path).await;
    assert_eq!(cache.total_lines(), 50_000);

    cache.ensure_visible(25_000.0 * 16.0, 800.0, 16.0).await;

    assert!(cache.is_range_loaded(24_990, 25_060));
    assert_eq!(
        cache.display_line(25_000).as_deref(),
        Some("00025000 lorem ipsum")
    );
    assert!(!cache.is_fully_loaded());
    assert!(cache.lines().len() < 5_000);
}

#[tokio::test]
async fn test_edit_and_save_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = big_file(&dir, 1_000);
    let cache = local_cache(200);
    cache.open(&path).await;

    cache.set_line_content(1, "first edit");
    cache.set_line_content(2, "second edit");
    cache.set_line_content(700, "far edit");
    cache.save_edits().await.unwrap();

    assert!(!cache.has_unsaved_changes());
    let on_disk = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = on_disk.lines().collect();
    assert_eq!(lines.len(), 1_000);
    assert_eq!(lines[0], "00000000 lorem ipsum");
    assert_eq!(lines[1], "first edit");
    assert_eq!(lines[2], "second edit");
    assert_eq!(lines[700], "far edit");
    assert!(on_disk.ends_with('\n'));

    // A fresh cache sees the saved content.
    let reopened = local_cache(200);
    reopened.open(&path).await;
    reopened.load_range(650, 750).await;
    assert_eq!(reopened.line(700).as_deref(), Some("far edit"));
}

#[tokio::test]
async fn test_full_content_matches_file() {
    let dir = TempDir::new().unwrap();
    let path = big_file(&dir, 750);
    let cache = local_cache(200);
    cache.open(&path).await;

    cache.load_all().await;

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(cache.loaded_ranges(), vec![LineRange::new(0, 750)]);
    assert_eq!(cache.full_content().as_deref(), Some(on_disk.trim_end_matches('\n')));
}

#[tokio::test]
async fn test_missing_file_reports_load_error() {
    let dir = TempDir::new().unwrap();
    let cache = local_cache(200);

    cache.open(dir.path().join("missing.txt")).await;

    assert!(cache.error().is_some());
    assert!(cache.loaded_ranges().is_empty());
}
