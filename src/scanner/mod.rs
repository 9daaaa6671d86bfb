//! カタログ取り込み
//!
//! フォルダ内の画像を探し、EXIFマップとJPEGプレビューを作ってカタログに登録する。

mod exif;

pub use self::exif::{orientation_descriptor, read_exif_map};

use crate::catalog::SqliteCatalog;
use crate::error::{MediaBrowserError, Result};
use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};
use media_browser_common::{ExifBlob, MediaRecord};
use rayon::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    /// 取り込みルートからの相対パス（区切りは `/`）
    pub relative_path: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// プレビューの長辺の上限（px）
pub const PREVIEW_MAX_SIZE: u32 = 1024;

pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<ImageInfo>> {
    if !folder.is_dir() {
        return Err(MediaBrowserError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !is_image_path(path) {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let relative_path = path
            .strip_prefix(folder)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        images.push(ImageInfo {
            path: path.to_path_buf(),
            file_name,
            relative_path,
        });
    }

    images.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(images)
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 1枚分のカタログ行を作る（プレビューやEXIFが作れなくても行は返す）
pub fn build_record(info: &ImageInfo) -> MediaRecord {
    let exif = read_exif_map(&info.path).map(ExifBlob::Structured);
    let preview_bytes = match make_preview(&info.path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            log::warn!("Could not build preview for {}: {}", info.path.display(), e);
            None
        }
    };

    MediaRecord {
        absolute_id: info.path.display().to_string(),
        relative_path: info.relative_path.clone(),
        preview_bytes,
        caption: None,
        exif,
    }
}

/// 長辺を `PREVIEW_MAX_SIZE` 以下に縮小したJPEG
///
/// 向きの補正はしない（表示時にEXIFで補正する）。
pub fn make_preview(path: &Path) -> Result<Vec<u8>> {
    let image = image::open(path)?;
    let image = if image.width() > PREVIEW_MAX_SIZE || image.height() > PREVIEW_MAX_SIZE {
        image.thumbnail(PREVIEW_MAX_SIZE, PREVIEW_MAX_SIZE)
    } else {
        image
    };

    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}

/// フォルダを取り込んでカタログに登録
///
/// # Returns
/// 登録した行数
pub fn ingest_folder(catalog: &SqliteCatalog, folder: &Path, recursive: bool) -> Result<usize> {
    let images = scan_folder(folder, recursive)?;
    if images.is_empty() {
        return Err(MediaBrowserError::NoImagesFound(folder.display().to_string()));
    }
    log::info!("found {} images in {}", images.len(), folder.display());

    let progress = ProgressBar::new(images.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let records: Vec<MediaRecord> = images
        .par_iter()
        .map(|info| {
            let record = build_record(info);
            progress.inc(1);
            record
        })
        .collect();
    progress.finish_with_message("done");

    catalog.insert_records(&records)
}
