//! キャッシュ機能テスト
//!
//! サムネイルキャッシュのキー・縮小・向き補正を検証

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use media_browser::thumbnail::{ThumbnailCache, ThumbnailProvider};
use media_browser_common::ExifBlob;
use std::io::Cursor;
use std::sync::Arc;

fn jpeg_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([shade, shade, shade])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).expect("JPEGエンコード失敗");
    out.into_inner()
}

fn rotated_cw() -> ExifBlob {
    ExifBlob::Text(r#"{"Image Orientation": "Rotated 90 CW"}"#.to_string())
}

/// 4000x3000 → 30x30 の枠に収めると 30x22
#[test]
fn test_large_image_fits_target() {
    let mut cache = ThumbnailCache::new(16);
    let bytes = jpeg_bytes(4000, 3000, 128);

    let thumb = cache.get_or_create(&bytes, (30, 30), None).expect("サムネイル生成失敗");
    assert_eq!(thumb.dimensions(), (30, 22));
}

/// 同じ入力の2回目はデコードしない
#[test]
fn test_second_request_is_cache_hit() {
    let mut cache = ThumbnailCache::new(16);
    let bytes = jpeg_bytes(64, 48, 10);
    let exif = rotated_cw();

    let first = cache.get_or_create(&bytes, (30, 30), Some(&exif)).unwrap();
    let second = cache.get_or_create(&bytes, (30, 30), Some(&exif)).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.len(), 1);
}

/// 同じ内容でも向きが違えば別エントリ
#[test]
fn test_orientation_is_part_of_key() {
    let mut cache = ThumbnailCache::new(16);
    let bytes = jpeg_bytes(64, 32, 10);

    let plain = cache.get_or_create(&bytes, (30, 30), None).unwrap();
    let rotated = cache.get_or_create(&bytes, (30, 30), Some(&rotated_cw())).unwrap();

    assert_eq!(plain.dimensions(), (30, 15));
    assert_eq!(rotated.dimensions(), (15, 30));
    assert_eq!(cache.len(), 2);
}

/// サイズ違いも別エントリ
#[test]
fn test_size_is_part_of_key() {
    let mut cache = ThumbnailCache::new(16);
    let bytes = jpeg_bytes(100, 100, 10);

    let small = cache.get_or_create(&bytes, (30, 30), None).unwrap();
    let large = cache.get_or_create(&bytes, (60, 60), None).unwrap();
    assert_eq!(small.dimensions(), (30, 30));
    assert_eq!(large.dimensions(), (60, 60));
    assert_eq!(cache.stats().misses, 2);
}

/// 壊れた画像は `None` でキャッシュされない
#[test]
fn test_corrupt_bytes_yield_none() {
    let mut cache = ThumbnailCache::new(16);
    let mut bytes = jpeg_bytes(20, 20, 10);
    bytes.truncate(10);

    assert!(cache.get_or_create(&bytes, (30, 30), None).is_none());
    assert!(cache.get_or_create(&bytes, (30, 30), None).is_none());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().decode_failures, 2);
}

/// clear で全エントリを破棄
#[test]
fn test_clear() {
    let mut cache = ThumbnailCache::new(16);
    for shade in 0..3 {
        cache.get_or_create(&jpeg_bytes(10, 10, shade * 50), (30, 30), None).unwrap();
    }
    assert_eq!(cache.len(), 3);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.bytes(), 0);
}

/// 壊れたEXIFでも向き補正なしでサムネイルは作れる
#[test]
fn test_broken_exif_still_renders() {
    let mut cache = ThumbnailCache::new(16);
    let bytes = jpeg_bytes(40, 20, 10);
    let exif = ExifBlob::Text("{{{{ not exif".to_string());

    let thumb = cache.get_or_create(&bytes, (30, 30), Some(&exif)).unwrap();
    assert_eq!(thumb.dimensions(), (30, 15));
}
