//! Pythonリテラル形式のパーサー
//!
//! `{'Make': 'Canon', 'FNumber': (28, 10), 'Flash': None}` のような
//! repr() 出力をJSON値に変換する。JSONの `true/false/null` も受け付ける。
//!
//! 対応:
//! - dict / list / tuple（tupleは配列として扱う）
//! - 単引用符・二重引用符の文字列、隣接文字列の連結、r/b/u 接頭辞
//! - 整数・小数・指数表記
//! - `True` / `False` / `None`

use crate::error::{Error, Result};
use serde_json::{Map, Number, Value};

/// 入れ子の上限（serde_jsonと同じ）
const MAX_DEPTH: usize = 128;

/// Pythonリテラル文字列をパース
///
/// 末尾に余分な文字があればエラー。
pub fn parse_literal(text: &str) -> Result<Value> {
    let mut parser = LiteralParser::new(text);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Parse(format!("{} at {}", message, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.nested(Self::parse_dict),
            Some('[') => self.nested(|p| p.parse_sequence('[', ']')),
            Some('(') => self.nested(|p| p.parse_sequence('(', ')')),
            Some('\'') | Some('"') => self.parse_strings(),
            Some(c) if is_string_prefix(c) && self.prefixed_quote_follows() => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            Some(c) if c.is_alphabetic() => self.parse_keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<Value>) -> Result<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_dict(&mut self) -> Result<Value> {
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key = key_string(self.parse_value()?)?;
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_sequence(&mut self, open: char, close: char) -> Result<Value> {
        self.expect(open)?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(&format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn prefixed_quote_follows(&self) -> bool {
        let mut offset = 0;
        while self.peek_at(offset).is_some_and(is_string_prefix) && offset < 2 {
            offset += 1;
        }
        matches!(self.peek_at(offset), Some('\'') | Some('"'))
    }

    /// 隣接する文字列リテラルは連結（Pythonと同じ）
    fn parse_strings(&mut self) -> Result<Value> {
        let mut out = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_whitespace();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.parse_string()?),
                Some(c) if is_string_prefix(c) && self.prefixed_quote_follows() => {
                    out.push_str(&self.parse_string()?)
                }
                _ => {
                    self.pos = save;
                    return Ok(Value::String(out));
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let mut raw = false;
        while let Some(c) = self.peek().filter(|c| is_string_prefix(*c)) {
            if c == 'r' || c == 'R' {
                raw = true;
            }
            self.pos += 1;
        }

        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quote")),
        };
        self.pos += 1;

        let mut out = String::new();
        loop {
            let c = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += 1;

            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }

            let escaped = self.peek().ok_or_else(|| self.error("unterminated escape"))?;
            self.pos += 1;
            if raw {
                out.push('\\');
                out.push(escaped);
                continue;
            }
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                'x' => out.push(self.parse_hex_escape(2)?),
                'u' => out.push(self.parse_hex_escape(4)?),
                other => {
                    // 未知のエスケープはPythonと同様にそのまま残す
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char> {
        let end = self.pos + digits;
        if end > self.chars.len() {
            return Err(self.error("truncated escape"));
        }
        let hex: String = self.chars[self.pos..end].iter().collect();
        let code = u32::from_str_radix(&hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.peek_at(1), Some('-') | Some('+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        let literal: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_' && **c != '+')
            .collect();

        if !is_float {
            if let Ok(n) = literal.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
        }

        literal
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("invalid number"))
    }

    fn parse_keyword(&mut self) -> Result<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(&format!("unknown name '{}'", word)))
            }
        }
    }
}

fn is_string_prefix(c: char) -> bool {
    matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U')
}

/// dictのキーを文字列化（Pythonでは数値やNoneもキーになり得る）
fn key_string(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(true) => Ok("True".into()),
        Value::Bool(false) => Ok("False".into()),
        Value::Null => Ok("None".into()),
        other => Err(Error::Parse(format!("unhashable key: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_python_dict() {
        let value = parse_literal("{'Make': 'Canon', 'ISOSpeedRatings': 200}").unwrap();
        assert_eq!(value, json!({"Make": "Canon", "ISOSpeedRatings": 200}));
    }

    #[test]
    fn test_parse_keywords_and_tuples() {
        let value = parse_literal("{'Flash': None, 'Raw': False, 'FNumber': (2.8,), 'Lens': [24, 70]}").unwrap();
        assert_eq!(
            value,
            json!({"Flash": null, "Raw": false, "FNumber": [2.8], "Lens": [24, 70]})
        );
    }

    #[test]
    fn test_parse_escapes_and_concatenation() {
        let value = parse_literal(r#"{'Note': 'it\'s ' "fine", 'Path': r'C:\temp'}"#).unwrap();
        assert_eq!(value["Note"], "it's fine");
        assert_eq!(value["Path"], r"C:\temp");
    }

    #[test]
    fn test_parse_numeric_keys_and_trailing_comma() {
        let value = parse_literal("{274: 6, 'ExposureTime': 0.004,}").unwrap();
        assert_eq!(value["274"], 6);
        assert_eq!(value["ExposureTime"], 0.004);
    }

    #[test]
    fn test_parse_negative_and_exponent() {
        assert_eq!(parse_literal("-12").unwrap(), json!(-12));
        assert_eq!(parse_literal("1e-3").unwrap(), json!(0.001));
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let deep = format!("{{'a': {}", "(".repeat(200_000));
        let err = parse_literal(&deep).unwrap_err();
        assert!(err.to_string().contains("nesting too deep"));

        let ok = format!("{}1{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_literal(&ok).is_ok());
        let too_deep = format!("{}1{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(parse_literal(&too_deep).is_err());
    }

    #[test]
    fn test_rejects_free_text() {
        assert!(parse_literal("rotation=90").is_err());
        assert!(parse_literal("{'a': 1} trailing").is_err());
        assert!(parse_literal("{'a': 1").is_err());
        assert!(parse_literal("").is_err());
    }
}
