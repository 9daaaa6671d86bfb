//! EXIFの向き記述による回転補正
//!
//! 参照するのは `Image Orientation` の記述文字列のみ。
//! 数値の向きコード（1〜8）は表示用で、補正には使わない。

use image::DynamicImage;
use media_browser_common::{parse_exif, ExifBlob, ExifProperties, ExifValue};

/// 画像に適用する回転
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationAction {
    Identity,
    /// 時計回りに90°（"Rotated 90 CW"）
    RotateClockwise,
    /// 反時計回りに90°（"Rotated 90 CCW"）
    RotateCounterClockwise,
}

impl OrientationAction {
    /// 記述文字列から回転を決める（大文字小文字・前後空白は無視）
    pub fn from_descriptor(descriptor: &str) -> Self {
        match descriptor.trim().to_lowercase().as_str() {
            "rotated 90 cw" => OrientationAction::RotateClockwise,
            "rotated 90 ccw" => OrientationAction::RotateCounterClockwise,
            "horizontal (normal)" => OrientationAction::Identity,
            _ => {
                log::info!("Unknown orientation value: {}", descriptor);
                OrientationAction::Identity
            }
        }
    }

    pub fn from_properties(props: &ExifProperties) -> Self {
        match props.orientation_descriptor() {
            None => OrientationAction::Identity,
            Some(ExifValue::Text(descriptor)) => Self::from_descriptor(descriptor),
            Some(other) => {
                log::info!("Unknown orientation value: {}", other);
                OrientationAction::Identity
            }
        }
    }

    /// 回転を適用（90°回転なので幅と高さが入れ替わり、切り取りは発生しない）
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            OrientationAction::Identity => image,
            OrientationAction::RotateClockwise => image.rotate90(),
            OrientationAction::RotateCounterClockwise => image.rotate270(),
        }
    }
}

/// パース済みプロパティに従って向きを補正
pub fn apply(image: DynamicImage, props: &ExifProperties) -> DynamicImage {
    OrientationAction::from_properties(props).apply(image)
}

/// EXIF列から直接補正（パースできなければそのまま返す）
pub fn normalize(image: DynamicImage, exif: Option<&ExifBlob>) -> DynamicImage {
    if exif.is_none() {
        return image;
    }
    apply(image, &parse_exif(exif).into_properties())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// 左上だけ赤い 40x20 の画像
    fn marked_image() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    fn blob(descriptor: &str) -> ExifBlob {
        ExifBlob::Text(format!(r#"{{"Image Orientation": "{}"}}"#, descriptor))
    }

    #[test]
    fn test_descriptor_mapping() {
        assert_eq!(
            OrientationAction::from_descriptor("Rotated 90 CW"),
            OrientationAction::RotateClockwise
        );
        assert_eq!(
            OrientationAction::from_descriptor("rotated 90 ccw"),
            OrientationAction::RotateCounterClockwise
        );
        assert_eq!(
            OrientationAction::from_descriptor("Horizontal (normal)"),
            OrientationAction::Identity
        );
        assert_eq!(
            OrientationAction::from_descriptor("Mirrored horizontal"),
            OrientationAction::Identity
        );
    }

    #[test]
    fn test_clockwise_swaps_dimensions() {
        let rotated = normalize(marked_image(), Some(&blob("Rotated 90 CW")));
        assert_eq!(rotated.dimensions(), (20, 40));
        // 時計回り: 左上の画素は右上へ
        assert_eq!(rotated.get_pixel(19, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_counter_clockwise_swaps_dimensions() {
        let rotated = normalize(marked_image(), Some(&blob("Rotated 90 CCW")));
        assert_eq!(rotated.dimensions(), (20, 40));
        // 反時計回り: 左上の画素は左下へ
        assert_eq!(rotated.get_pixel(0, 39), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_independent_calls_each_rotate_source() {
        let source = marked_image();
        let cw = normalize(source.clone(), Some(&blob("Rotated 90 CW")));
        let ccw = normalize(source.clone(), Some(&blob("Rotated 90 CCW")));
        assert_eq!(cw.dimensions(), (20, 40));
        assert_eq!(ccw.dimensions(), (20, 40));
        assert_ne!(cw.to_rgba8().into_raw(), ccw.to_rgba8().into_raw());
    }

    #[test]
    fn test_missing_or_broken_metadata_is_identity() {
        let source = marked_image();
        assert_eq!(normalize(source.clone(), None).dimensions(), (40, 20));
        assert_eq!(
            normalize(source.clone(), Some(&ExifBlob::Text("garbage".into()))).dimensions(),
            (40, 20)
        );

        let mut props = ExifProperties::new();
        props.insert("Image Orientation", ExifValue::Number(6.0));
        assert_eq!(apply(source, &props).dimensions(), (40, 20));
    }
}
