//! EXIFプロパティの表示変換
//!
//! 既知のキーは読みやすいラベルに置き換え、値を整形する。
//! 未知のキーはタイトルケースにしてそのまま表示する。

use crate::exif::{format_number, ExifProperties, ExifValue};
use chrono::NaiveDateTime;

/// EXIFがないときの表示行
pub const NO_EXIF_ROW: (&str, &str) = ("No data", "EXIF information missing");

const SOURCE_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const DISPLAY_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// 既知キー → 表示ラベル（表示順）
const KNOWN_KEYS: &[(&str, &str)] = &[
    ("Make", "Manufacturer"),
    ("Model", "Model"),
    ("DateTime", "Date and time"),
    ("ExposureTime", "Exposure"),
    ("FNumber", "Aperture"),
    ("ISOSpeedRatings", "ISO"),
    ("FocalLength", "Focal length"),
    ("LensModel", "Lens"),
    ("GPSLatitude", "Latitude"),
    ("GPSLongitude", "Longitude"),
    ("ImageWidth", "Width"),
    ("ImageHeight", "Height"),
    ("Orientation", "Orientation"),
    ("Software", "Software"),
    ("Rotation", "Rotation"),
    ("rotation", "Rotation"),
    ("Rotate", "Rotation"),
    ("rotate", "Rotation"),
    ("Angle", "Angle"),
    ("angle", "Angle"),
];

/// 表示用の (ラベル, 値) 行に変換
pub fn display_rows(props: &ExifProperties) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for (key, label) in KNOWN_KEYS {
        if let Some(value) = props.get(key) {
            rows.push((label.to_string(), format_known(key, value)));
        }
    }

    for (key, value) in props.iter() {
        if is_known(key) || value.is_blank() {
            continue;
        }
        rows.push((title_case(&key.replace('_', " ")), value.to_string()));
    }

    rows
}

fn is_known(key: &str) -> bool {
    KNOWN_KEYS.iter().any(|(k, _)| *k == key)
}

fn format_known(key: &str, value: &ExifValue) -> String {
    match key {
        "ExposureTime" => format_exposure(value),
        "FNumber" => match numeric(value) {
            Some(n) => format!("f/{}", format_number(n)),
            None => value.to_string(),
        },
        "FocalLength" => match numeric(value) {
            Some(n) => format!("{} mm", format_number(n)),
            None => value.to_string(),
        },
        "DateTime" => match value {
            ExifValue::Text(s) => format_datetime(s),
            other => other.to_string(),
        },
        "Orientation" => format_orientation(value),
        "Rotation" | "rotation" | "Rotate" | "rotate" | "Angle" | "angle" => format_angle(value),
        _ => value.to_string(),
    }
}

/// 数値または数値配列の先頭（文字列はそのまま表示に回す）
fn numeric(value: &ExifValue) -> Option<f64> {
    match value {
        ExifValue::Number(n) => Some(*n),
        ExifValue::Numbers(v) => v.first().copied(),
        _ => None,
    }
}

/// 1秒未満は分数表示（0.004 → 1/250）
pub fn format_exposure(value: &ExifValue) -> String {
    match numeric(value) {
        Some(n) if n > 0.0 && n < 1.0 => format!("1/{}", (1.0 / n).round() as i64),
        Some(n) => format_number(n),
        None => value.to_string(),
    }
}

/// `2024:05:01 13:45:00` → `01.05.2024 13:45:00`（形式が違えばそのまま）
pub fn format_datetime(text: &str) -> String {
    match NaiveDateTime::parse_from_str(text.trim(), SOURCE_DATETIME_FORMAT) {
        Ok(dt) => dt.format(DISPLAY_DATETIME_FORMAT).to_string(),
        Err(_) => text.to_string(),
    }
}

/// 標準EXIF向きコードの意味
pub fn orientation_meaning(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("Normal (0°)"),
        2 => Some("Flipped horizontally"),
        3 => Some("Rotated 180°"),
        4 => Some("Flipped vertically"),
        5 => Some("Transposed (90° CW + flip)"),
        6 => Some("Rotated 90° CW"),
        7 => Some("Transverse (90° CCW + flip)"),
        8 => Some("Rotated 90° CCW"),
        _ => None,
    }
}

fn format_orientation(value: &ExifValue) -> String {
    match value.as_integer() {
        Some(code) => match orientation_meaning(code) {
            Some(meaning) => format!("{} ({})", code, meaning),
            None => format_angle(value),
        },
        None => value.to_string(),
    }
}

/// 0〜360の整数には度記号を付ける
fn format_angle(value: &ExifValue) -> String {
    match value.as_integer() {
        Some(deg) if (0..=360).contains(&deg) => format!("{}°", deg),
        _ => value.to_string(),
    }
}

/// Pythonの `str.title()` 相当（英字の連続ごとに先頭だけ大文字）
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
