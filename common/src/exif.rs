//! EXIFメタデータパーサー
//!
//! カタログのEXIF列は構造化済みのマップか、壊れている可能性のある文字列。
//! 文字列は以下の順にパースを試み、最初に成功した結果を使う:
//! 1. 厳密なJSONパース（JSON文字列の中のJSONは1段だけ展開）
//! 2. 外側の引用符を1組外して再度JSONパース
//! 3. Pythonリテラル形式としてパース
//! 4. 正規表現で向き・回転・角度のヒントを抽出
//!
//! どれも失敗したら空のプロパティ。呼び出し側にエラーは返さない。

use crate::literal::parse_literal;
use crate::types::ExifBlob;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

/// 向き補正に使うプロパティ名（記述文字列: "Rotated 90 CW" など）
pub const ORIENTATION_DESCRIPTOR_KEY: &str = "Image Orientation";

/// プロパティ値
#[derive(Debug, Clone, PartialEq)]
pub enum ExifValue {
    Text(String),
    Number(f64),
    /// 数値配列（露出時間・レンズ情報など）
    Numbers(Vec<f64>),
    /// 上記以外（真偽値・ネストしたオブジェクト・null）
    Raw(Value),
}

impl ExifValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => ExifValue::Text(s),
            Value::Number(n) => match n.as_f64() {
                Some(f) => ExifValue::Number(f),
                None => ExifValue::Raw(Value::Number(n)),
            },
            Value::Array(items) if items.iter().all(Value::is_number) => {
                ExifValue::Numbers(items.iter().filter_map(Value::as_f64).collect())
            }
            other => ExifValue::Raw(other),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExifValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 先頭の数値（配列なら先頭要素、数字だけの文字列も許容）
    pub fn first_number(&self) -> Option<f64> {
        match self {
            ExifValue::Number(n) => Some(*n),
            ExifValue::Numbers(v) => v.first().copied(),
            ExifValue::Text(s) => s.trim().parse().ok(),
            ExifValue::Raw(_) => None,
        }
    }

    /// 整数として解釈できる場合のみ
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ExifValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            ExifValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// null・空文字・空配列
    pub fn is_blank(&self) -> bool {
        match self {
            ExifValue::Text(s) => s.is_empty(),
            ExifValue::Numbers(v) => v.is_empty(),
            ExifValue::Raw(Value::Null) => true,
            ExifValue::Raw(Value::Array(items)) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for ExifValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExifValue::Text(s) => f.write_str(s),
            ExifValue::Number(n) => f.write_str(&format_number(*n)),
            ExifValue::Numbers(v) => {
                let items: Vec<String> = v.iter().map(|n| format_number(*n)).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ExifValue::Raw(Value::Null) => f.write_str("None"),
            ExifValue::Raw(value) => write!(f, "{}", value),
        }
    }
}

/// 整数値なら小数点なしで表示
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// 正規名 → 値のマッピング（挿入順を保持）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifProperties {
    entries: Vec<(String, ExifValue)>,
}

impl ExifProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut props = Self::new();
        for (key, value) in map {
            props.insert(key, ExifValue::from_json(value));
        }
        props
    }

    /// 同名キーは上書き
    pub fn insert(&mut self, key: impl Into<String>, value: ExifValue) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&ExifValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExifValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 向き補正用の記述文字列
    pub fn orientation_descriptor(&self) -> Option<&ExifValue> {
        self.get(ORIENTATION_DESCRIPTOR_KEY)
    }
}

/// どの段階でパースに成功したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// 構造化済みマップをそのまま使用
    Structured,
    StrictJson,
    QuoteStripped,
    PythonLiteral,
    RegexHints,
}

impl ParseStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ParseStrategy::Structured => "structured mapping",
            ParseStrategy::StrictJson => "strict JSON",
            ParseStrategy::QuoteStripped => "JSON after stripping quotes",
            ParseStrategy::PythonLiteral => "Python literal",
            ParseStrategy::RegexHints => "regex extraction",
        }
    }
}

/// パース結果
#[derive(Debug, Clone, PartialEq)]
pub enum ExifParse {
    Parsed(ExifProperties, ParseStrategy),
    Empty,
}

impl ExifParse {
    pub fn properties(&self) -> ExifProperties {
        match self {
            ExifParse::Parsed(props, _) => props.clone(),
            ExifParse::Empty => ExifProperties::new(),
        }
    }

    pub fn into_properties(self) -> ExifProperties {
        match self {
            ExifParse::Parsed(props, _) => props,
            ExifParse::Empty => ExifProperties::new(),
        }
    }

    pub fn strategy(&self) -> Option<ParseStrategy> {
        match self {
            ExifParse::Parsed(_, strategy) => Some(*strategy),
            ExifParse::Empty => None,
        }
    }
}

type Strategy = fn(&str) -> Option<ExifProperties>;

/// 文字列に対するパース戦略（先頭から順に試す）
const TEXT_STRATEGIES: &[(ParseStrategy, Strategy)] = &[
    (ParseStrategy::StrictJson, parse_strict_json),
    (ParseStrategy::QuoteStripped, parse_quote_stripped),
    (ParseStrategy::PythonLiteral, parse_python_literal),
    (ParseStrategy::RegexHints, parse_regex_hints),
];

/// EXIFメタデータをパース
///
/// # Arguments
/// * `blob` - カタログのEXIF列（なければ `None`）
///
/// # Returns
/// * `ExifParse::Parsed` - いずれかの戦略で1件以上のプロパティを得た
/// * `ExifParse::Empty` - 入力なし、またはすべての戦略が失敗
pub fn parse_exif(blob: Option<&ExifBlob>) -> ExifParse {
    match blob {
        None => ExifParse::Empty,
        Some(ExifBlob::Structured(map)) => {
            let props = ExifProperties::from_map(map.clone());
            if props.is_empty() {
                ExifParse::Empty
            } else {
                ExifParse::Parsed(props, ParseStrategy::Structured)
            }
        }
        Some(ExifBlob::Text(text)) => parse_exif_text(text),
    }
}

/// 文字列のEXIFメタデータをパース
pub fn parse_exif_text(text: &str) -> ExifParse {
    if text.trim().is_empty() {
        return ExifParse::Empty;
    }

    for (strategy, parse) in TEXT_STRATEGIES {
        if let Some(props) = parse(text) {
            if !props.is_empty() {
                log::debug!("EXIF parsed via {}", strategy.name());
                return ExifParse::Parsed(props, *strategy);
            }
        }
    }

    log::debug!("EXIF unparseable, {} chars", text.len());
    ExifParse::Empty
}

fn object_from_json(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        // 二重エンコード: JSON文字列の中身がJSONオブジェクト
        Value::String(inner) => match serde_json::from_str::<Value>(&inner).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn parse_strict_json(text: &str) -> Option<ExifProperties> {
    object_from_json(text).map(ExifProperties::from_map)
}

fn parse_quote_stripped(text: &str) -> Option<ExifProperties> {
    let stripped = strip_enclosing_quotes(text.trim())?;
    object_from_json(stripped).map(ExifProperties::from_map)
}

fn parse_python_literal(text: &str) -> Option<ExifProperties> {
    match parse_literal(text.trim()).ok()? {
        Value::Object(map) => Some(ExifProperties::from_map(map)),
        _ => None,
    }
}

fn parse_regex_hints(text: &str) -> Option<ExifProperties> {
    let mut props = ExifProperties::new();

    if let Some(caps) = DESCRIPTOR_RE.captures(text) {
        props.insert(ORIENTATION_DESCRIPTOR_KEY, ExifValue::Text(caps[1].trim().to_string()));
    }

    for hint in rotation_hints(text) {
        if let Some(first) = hint.values.first().and_then(|v| v.parse::<f64>().ok()) {
            props.insert(hint.key, ExifValue::Number(first));
        }
    }

    if props.is_empty() {
        None
    } else {
        Some(props)
    }
}

/// 外側の引用符を1組だけ外す（`"..."` または `'...'`）
fn strip_enclosing_quotes(text: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

lazy_static! {
    static ref DESCRIPTOR_RE: Regex =
        Regex::new(r#"(?i)image orientation["']?\s*[:=]\s*["']([^"']+)["']"#).unwrap();

    /// (正規名, パターン)。`"key": v` / `key=v` / `key: v` を許容
    static ref HINT_PATTERNS: Vec<(&'static str, Regex)> = [
        ("Orientation", r#"(?i)\borientation["']?\s*[:=]\s*["']?(\d+)"#),
        ("Rotation", r#"(?i)\brotation["']?\s*[:=]\s*["']?(\d+)"#),
        ("Rotate", r#"(?i)\brotate["']?\s*[:=]\s*["']?(\d+)"#),
        ("Angle", r#"(?i)\bangle["']?\s*[:=]\s*["']?(\d+)"#),
    ]
    .into_iter()
    .map(|(key, pattern)| (key, Regex::new(pattern).unwrap()))
    .collect();
}

/// 正規表現で見つかった回転系のヒント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationHint {
    pub key: &'static str,
    /// 出現順のすべての値
    pub values: Vec<String>,
}

/// テキスト全体から回転系のキーと数値を探す
pub fn rotation_hints(text: &str) -> Vec<RotationHint> {
    HINT_PATTERNS
        .iter()
        .filter_map(|(key, re)| {
            let values: Vec<String> = re
                .captures_iter(text)
                .map(|caps| caps[1].to_string())
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(RotationHint { key: *key, values })
            }
        })
        .collect()
}
