//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use media_browser::catalog::{CatalogStore, SqliteCatalog};
use media_browser::error::MediaBrowserError;
use media_browser::scanner;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"), false);
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, MediaBrowserError::FolderNotFound(_)));
}

/// 空のフォルダをスキャンした場合
#[test]
fn test_scan_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = scanner::scan_folder(dir.path(), true);

    // 空フォルダはエラーではなく空のVecを返す
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// 画像のないフォルダを取り込んだ場合
#[test]
fn test_ingest_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();

    let catalog = SqliteCatalog::open_in_memory().unwrap();
    let result = scanner::ingest_folder(&catalog, dir.path(), false);
    assert!(matches!(result, Err(MediaBrowserError::NoImagesFound(_))));
}

/// 存在しない行の詳細
#[test]
fn test_fetch_detail_missing_row() {
    let catalog = SqliteCatalog::open_in_memory().unwrap();
    assert!(catalog.fetch_detail("/nope.jpg").unwrap().is_none());
}

/// 開けないDBファイル
#[test]
fn test_open_catalog_on_directory_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = SqliteCatalog::open(dir.path());
    let err = result.err().expect("ディレクトリはDBとして開けない");
    assert!(matches!(err, MediaBrowserError::Database(_)));
    assert!(!err.status_message().starts_with("Error:"));
}

/// MediaBrowserErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        MediaBrowserError::Config("テスト設定エラー".to_string()),
        MediaBrowserError::Store("接続エラー".to_string()),
        MediaBrowserError::Runtime("no reactor".to_string()),
        MediaBrowserError::FetchInFlight,
        MediaBrowserError::FolderNotFound("/path/to/folder".to_string()),
        MediaBrowserError::RecordNotFound("/a.jpg".to_string()),
        MediaBrowserError::NoImagesFound("フォルダ".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty());
        assert!(!err.status_message().is_empty());
    }
}

/// 取得中の拒否はステータスでは読み込み中として表示
#[test]
fn test_fetch_in_flight_status() {
    assert_eq!(MediaBrowserError::FetchInFlight.status_message(), "Loading...");
}
