use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// カタログに書き込むEXIFマップを読み取る
///
/// キーはタグ名。向きコードがあれば `Image Orientation` に記述文字列も入れる。
/// 読めないファイルやEXIFのない画像は `None`。
pub fn read_exif_map(path: &Path) -> Option<Map<String, Value>> {
    let file = File::open(path).ok()?;
    let mut bufreader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(e) => {
            log::debug!("no EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    let mut map = Map::new();
    for field in exif.fields() {
        if field.ifd_num != exif::In::PRIMARY {
            continue;
        }
        let Some(value) = field_value(&field.value) else {
            continue;
        };

        let key = tag_key(field.tag);
        if field.tag == exif::Tag::Orientation {
            if let Some(descriptor) = field.value.get_uint(0).and_then(orientation_descriptor) {
                map.insert("Image Orientation".to_string(), Value::from(descriptor));
            }
        }
        map.insert(key, value);
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

/// 表示側の既知キーに合わせたタグ名
fn tag_key(tag: exif::Tag) -> String {
    match tag {
        exif::Tag::PhotographicSensitivity => "ISOSpeedRatings".to_string(),
        exif::Tag::PixelXDimension => "ImageWidth".to_string(),
        exif::Tag::PixelYDimension => "ImageHeight".to_string(),
        other => other.to_string(),
    }
}

/// 向きコード（1〜8）の記述文字列
pub fn orientation_descriptor(code: u32) -> Option<&'static str> {
    match code {
        1 => Some("Horizontal (normal)"),
        2 => Some("Mirrored horizontal"),
        3 => Some("Rotated 180"),
        4 => Some("Mirrored vertical"),
        5 => Some("Mirrored horizontal then rotated 90 CCW"),
        6 => Some("Rotated 90 CW"),
        7 => Some("Mirrored horizontal then rotated 90 CW"),
        8 => Some("Rotated 90 CCW"),
        _ => None,
    }
}

/// EXIFの値をJSONへ（バイナリ値は捨てる）
fn field_value(value: &exif::Value) -> Option<Value> {
    let numbers: Vec<f64> = match value {
        exif::Value::Ascii(parts) => {
            let text = parts
                .iter()
                .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').trim().to_string())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            return if text.is_empty() { None } else { Some(Value::from(text)) };
        }
        exif::Value::Byte(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::Short(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::Long(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::SByte(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::SShort(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::SLong(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::Float(v) => v.iter().map(|&n| n as f64).collect(),
        exif::Value::Double(v) => v.clone(),
        exif::Value::Rational(v) => v
            .iter()
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64())
            .collect(),
        exif::Value::SRational(v) => v
            .iter()
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64())
            .collect(),
        _ => return None,
    };

    match numbers.as_slice() {
        [] => None,
        [single] if is_integral_value(value) => Some(Value::from(*single as i64)),
        _ if is_integral_value(value) => Some(Value::from(
            numbers.iter().map(|&n| n as i64).collect::<Vec<_>>(),
        )),
        // 有理数は配列のまま（表示側で先頭を使う）
        _ => Some(Value::from(numbers)),
    }
}

fn is_integral_value(value: &exif::Value) -> bool {
    matches!(
        value,
        exif::Value::Byte(_)
            | exif::Value::Short(_)
            | exif::Value::Long(_)
            | exif::Value::SByte(_)
            | exif::Value::SShort(_)
            | exif::Value::SLong(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_descriptor() {
        assert_eq!(orientation_descriptor(1), Some("Horizontal (normal)"));
        assert_eq!(orientation_descriptor(6), Some("Rotated 90 CW"));
        assert_eq!(orientation_descriptor(8), Some("Rotated 90 CCW"));
        assert_eq!(orientation_descriptor(9), None);
    }

    #[test]
    fn test_field_value_conversion() {
        assert_eq!(
            field_value(&exif::Value::Ascii(vec![b"Canon".to_vec()])),
            Some(Value::from("Canon"))
        );
        assert_eq!(field_value(&exif::Value::Short(vec![6])), Some(Value::from(6)));
        assert_eq!(
            field_value(&exif::Value::Rational(vec![exif::Rational { num: 1, denom: 250 }])),
            Some(Value::from(vec![0.004]))
        );
        assert_eq!(field_value(&exif::Value::Undefined(vec![1, 2], 0)), None);
    }

    #[test]
    fn test_tag_key_uses_display_names() {
        assert_eq!(tag_key(exif::Tag::PhotographicSensitivity), "ISOSpeedRatings");
        assert_eq!(tag_key(exif::Tag::Make), "Make");
        assert_eq!(tag_key(exif::Tag::DateTime), "DateTime");
    }

    #[test]
    fn test_missing_file() {
        assert!(read_exif_map(Path::new("/nonexistent/img.jpg")).is_none());
    }
}
