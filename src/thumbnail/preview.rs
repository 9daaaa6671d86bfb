use crate::error::Result;
use crate::orientation;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use media_browser_common::ExifBlob;

use super::cache::fit_dimensions;

/// プレビュー表示領域の余白（px）
pub const PREVIEW_MARGIN: u32 = 20;

/// プレビューをデコードして向きを補正
pub fn decode_preview(bytes: &[u8], exif: Option<&ExifBlob>) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes)?;
    Ok(orientation::normalize(image, exif))
}

/// 表示領域（余白込み）に収まるよう縮小する
///
/// 収まっている画像はそのまま返す（拡大しない）。
pub fn fit_preview(image: DynamicImage, canvas_width: u32, canvas_height: u32) -> DynamicImage {
    let max_width = canvas_width.saturating_sub(PREVIEW_MARGIN * 2).max(1);
    let max_height = canvas_height.saturating_sub(PREVIEW_MARGIN * 2).max(1);

    let (width, height) = image.dimensions();
    if width <= max_width && height <= max_height {
        return image;
    }

    let (w, h) = fit_dimensions(width, height, max_width, max_height);
    image.resize_exact(w, h, FilterType::Lanczos3)
}
