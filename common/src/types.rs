//! カタログの型定義
//!
//! CLIとセッションで共有される型:
//! - MediaRecord: カタログの1行（ページ取得の単位）
//! - MediaDetail: 選択時に取得する1件分の詳細
//! - CatalogQuery: ページ取得の条件（値型、比較で古い結果を判定）
//! - PageResult: 1ページ分の取得結果

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// EXIFメタデータ（型消去: 構造化済みマップ or 文字列）
///
/// 文字列は壊れている可能性がある（余分な引用符、二重エンコード、
/// Pythonリテラル形式など）。解釈は `exif::parse_exif` に任せる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExifBlob {
    Structured(Map<String, Value>),
    Text(String),
}

impl ExifBlob {
    /// キャッシュキー・検索用の文字列表現
    pub fn to_key_string(&self) -> String {
        match self {
            ExifBlob::Text(text) => text.clone(),
            ExifBlob::Structured(map) => Value::Object(map.clone()).to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExifBlob::Text(_) => "string",
            ExifBlob::Structured(_) => "mapping",
        }
    }
}

impl From<&str> for ExifBlob {
    fn from(text: &str) -> Self {
        ExifBlob::Text(text.to_string())
    }
}

/// カタログの1行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// 一意キー（取り込み時の絶対パス）
    pub absolute_id: String,

    /// ディスクラベルからの相対パス（並び順のキー）
    pub relative_path: String,

    #[serde(default, skip_serializing)]
    pub preview_bytes: Option<Vec<u8>>,

    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub exif: Option<ExifBlob>,
}

impl MediaRecord {
    pub fn has_preview(&self) -> bool {
        self.preview_bytes.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// 表示用のファイル名（パスの最後の要素）
    pub fn file_name(&self) -> &str {
        short_name(&self.absolute_id)
    }
}

/// 選択時の詳細（1件分の再取得）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaDetail {
    pub absolute_id: String,
    pub relative_path: String,
    pub preview_bytes: Option<Vec<u8>>,
    pub caption: Option<String>,
    pub exif: Option<ExifBlob>,
}

/// ページ取得条件
///
/// 同一性で「まだ有効な取得か」を判定するため、全フィールドを比較する。
/// 条件が同じでも検索をやり直すと `generation` が変わる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    pub search_term: String,
    pub hide_without_preview: bool,
    pub limit: usize,
    pub offset: usize,
    #[serde(default)]
    pub generation: u64,
}

impl CatalogQuery {
    pub fn new(search_term: &str, hide_without_preview: bool, limit: usize) -> Self {
        Self {
            search_term: search_term.trim().to_string(),
            hide_without_preview,
            limit,
            offset: 0,
            generation: 0,
        }
    }

    pub fn with_generation(self, generation: u64) -> Self {
        Self { generation, ..self }
    }

    /// 同じ条件で次のページを指すクエリ
    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            ..self.clone()
        }
    }
}

/// 1ページ分の取得結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub rows: Vec<MediaRecord>,
    /// 取得件数 == limit のとき true
    pub has_more: bool,
}

impl PageResult {
    pub fn from_rows(rows: Vec<MediaRecord>, limit: usize) -> Self {
        let has_more = limit > 0 && rows.len() == limit;
        Self { rows, has_more }
    }
}

/// パスの最後の要素（`/` と `\` の両方を区切りとして扱う）
pub fn short_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_has_more_when_full() {
        let rows = vec![MediaRecord::default(); 100];
        assert!(PageResult::from_rows(rows, 100).has_more);

        let rows = vec![MediaRecord::default(); 37];
        assert!(!PageResult::from_rows(rows, 100).has_more);
    }

    #[test]
    fn test_query_next_page_keeps_filters() {
        let query = CatalogQuery::new("  beach ", true, 100);
        assert_eq!(query.search_term, "beach");

        let next = query.next_page();
        assert_eq!(next.offset, 100);
        assert_eq!(next.search_term, "beach");
        assert!(next.hide_without_preview);
        assert_ne!(query, next);
    }

    #[test]
    fn test_exif_blob_untagged() {
        let blob: ExifBlob = serde_json::from_str(r#"{"Make": "Canon"}"#).unwrap();
        assert_eq!(blob.kind(), "mapping");

        let blob: ExifBlob = serde_json::from_str(r#""{'Make': 'Canon'}""#).unwrap();
        assert_eq!(blob, ExifBlob::Text("{'Make': 'Canon'}".into()));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("/data/photos/2024/img.jpg"), "img.jpg");
        assert_eq!(short_name(r"X:\photos\img.jpg"), "img.jpg");
        assert_eq!(short_name("img.jpg"), "img.jpg");
    }
}
