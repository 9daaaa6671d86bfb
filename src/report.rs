//! EXIF診断レポート
//!
//! 1件分のEXIF列がどう解釈されるかをテキストで出力する（`exif` サブコマンド）。

use media_browser_common::exif::rotation_hints;
use media_browser_common::{parse_exif, ExifBlob, MediaDetail};

const RULE_WIDE: usize = 80;
const RULE_NARROW: usize = 40;
const HEAD_CHARS: usize = 500;

/// 詳細からレポートを作成
pub fn detail_report(detail: &MediaDetail) -> String {
    let preview_exists = detail.preview_bytes.is_some();
    exif_report(&detail.absolute_id, preview_exists, detail.exif.as_ref())
}

pub fn exif_report(absolute_id: &str, preview_exists: bool, exif: Option<&ExifBlob>) -> String {
    let mut lines = vec![
        format!("File: {}", absolute_id),
        format!("Preview exists: {}", preview_exists),
        String::new(),
        "EXIF data:".to_string(),
        "=".repeat(RULE_WIDE),
    ];

    match exif {
        None => lines.push("No EXIF data".to_string()),
        Some(blob @ ExifBlob::Structured(map)) => {
            lines.push(format!("Type: {}", blob.kind()));
            lines.push(pretty(&serde_json::Value::Object(map.clone())));
        }
        Some(blob @ ExifBlob::Text(text)) => {
            lines.push(format!("Type: {}", blob.kind()));
            lines.push(format!("Length: {} characters", text.chars().count()));
            lines.push(String::new());
            lines.push("Raw content:".to_string());
            lines.push("-".repeat(RULE_NARROW));
            lines.push(text.clone());
            lines.push(String::new());
            lines.push("-".repeat(RULE_NARROW));

            match serde_json::from_str::<serde_json::Value>(text) {
                Ok(parsed) => {
                    lines.push("\nParsed as JSON:".to_string());
                    lines.push(pretty(&parsed));
                }
                Err(e) => {
                    lines.push(format!("\nJSON parse error: {}", e));
                    lines.push("\nFirst 500 characters:".to_string());
                    lines.push(text.chars().take(HEAD_CHARS).collect());

                    lines.push("\n\nSearching for rotation patterns:".to_string());
                    for hint in rotation_hints(text) {
                        lines.push(format!("  {}: {}", hint.key, hint.values.join(", ")));
                    }
                }
            }

            let parse = parse_exif(Some(blob));
            let strategy = parse.strategy().map(|s| s.name()).unwrap_or("none");
            lines.push(format!(
                "\nParse strategy: {} ({} properties)",
                strategy,
                parse.properties().len()
            ));
        }
    }

    lines.join("\n")
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_without_exif() {
        let report = exif_report("/a/b.jpg", false, None);
        assert!(report.starts_with("File: /a/b.jpg\nPreview exists: false"));
        assert!(report.ends_with("No EXIF data"));
    }

    #[test]
    fn test_report_valid_json() {
        let blob = ExifBlob::Text(r#"{"Make": "Canon"}"#.into());
        let report = exif_report("/a/b.jpg", true, Some(&blob));
        assert!(report.contains("Type: string"));
        assert!(report.contains("Length: 17 characters"));
        assert!(report.contains("Parsed as JSON:"));
        assert!(report.contains("Parse strategy: strict JSON"));
        assert!(!report.contains("Searching for rotation patterns"));
    }

    #[test]
    fn test_report_broken_text_lists_rotation_hints() {
        let blob = ExifBlob::Text("garbage Orientation: 6, angle=90 more".into());
        let report = exif_report("/a/b.jpg", true, Some(&blob));
        assert!(report.contains("JSON parse error:"));
        assert!(report.contains("First 500 characters:"));
        assert!(report.contains("Searching for rotation patterns:"));
        assert!(report.contains("  Orientation: 6"));
        assert!(report.contains("  Angle: 90"));
        assert!(report.contains("Parse strategy: regex extraction"));
    }
}
