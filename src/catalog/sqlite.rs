use super::CatalogStore;
use crate::error::{MediaBrowserError, Result};
use media_browser_common::{CatalogQuery, ExifBlob, MediaDetail, MediaRecord};
use rusqlite::types::Value as SqlValue;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLiteのカタログ
///
/// 接続は1本を共有する（ページ取得と詳細取得が同時に来ても直列化される）。
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// DBファイルを開く（なければ作成）
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        log::debug!("opening catalog: {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        register_casefold(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MediaBrowserError::Store("catalog connection poisoned".into()))
    }

    /// 接続確認（`SELECT 1`）
    pub fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// 行を追加（同じIDは置き換え）
    pub fn insert_records(&self, records: &[MediaRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO images_collection
                 (abs_filename, rel_filename, preview, latest_caption, exif)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.absolute_id,
                    record.relative_path,
                    record.preview_bytes,
                    record.caption,
                    record.exif.as_ref().map(ExifBlob::to_key_string),
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM images_collection", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl CatalogStore for SqliteCatalog {
    fn fetch_page(&self, query: &CatalogQuery) -> Result<Vec<MediaRecord>> {
        let mut where_clauses = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if !query.search_term.is_empty() {
            where_clauses.push(
                r"(casefold(latest_caption) LIKE ?1 ESCAPE '\'
                  OR casefold(exif) LIKE ?1 ESCAPE '\'
                  OR casefold(rel_filename) LIKE ?1 ESCAPE '\')",
            );
            values.push(SqlValue::Text(like_pattern(&query.search_term.to_lowercase())));
        }

        if query.hide_without_preview {
            where_clauses.push("(preview IS NOT NULL AND length(preview) > 0)");
        }

        let where_clause = if where_clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_clauses.join(" AND "))
        };

        let limit_index = values.len() + 1;
        let sql = format!(
            "SELECT abs_filename, rel_filename, preview, latest_caption, exif
             FROM images_collection
             {}
             ORDER BY rel_filename DESC
             LIMIT ?{} OFFSET ?{}",
            where_clause,
            limit_index,
            limit_index + 1
        );
        values.push(SqlValue::Integer(query.limit as i64));
        values.push(SqlValue::Integer(query.offset as i64));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(MediaRecord {
                absolute_id: row.get(0)?,
                relative_path: row.get(1)?,
                preview_bytes: row.get(2)?,
                caption: row.get(3)?,
                exif: exif_from_column(row.get(4)?),
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }

        log::debug!(
            "fetched {} rows (term='{}', offset={}, limit={})",
            records.len(),
            query.search_term,
            query.offset,
            query.limit
        );
        Ok(records)
    }

    fn fetch_detail(&self, absolute_id: &str) -> Result<Option<MediaDetail>> {
        let conn = self.lock()?;
        let detail = conn
            .query_row(
                "SELECT rel_filename, preview, latest_caption, exif
                 FROM images_collection
                 WHERE abs_filename = ?1",
                params![absolute_id],
                |row| {
                    Ok(MediaDetail {
                        absolute_id: absolute_id.to_string(),
                        relative_path: row.get(0)?,
                        preview_bytes: row.get(1)?,
                        caption: row.get(2)?,
                        exif: exif_from_column(row.get(3)?),
                    })
                },
            )
            .optional()?;
        Ok(detail)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS images_collection (
            abs_filename    TEXT PRIMARY KEY,
            rel_filename    TEXT NOT NULL,
            preview         BLOB,
            latest_caption  TEXT,
            exif            TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_images_rel_filename
            ON images_collection(rel_filename DESC);",
    )?;
    Ok(())
}

/// `casefold(text)`: Unicodeの小文字化（組み込みのLIKEはASCIIしか畳まない）
fn register_casefold(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )?;
    Ok(())
}

/// JSONオブジェクトとして妥当なものは構造化済みとして返す（JSON列と同じ扱い）
fn exif_from_column(text: Option<String>) -> Option<ExifBlob> {
    let text = text?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::Object(map)) => Some(ExifBlob::Structured(map)),
        _ => Some(ExifBlob::Text(text)),
    }
}

/// 部分一致用のLIKEパターン（`%` `_` `\` はエスケープ）
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("beach"), "%beach%");
        assert_eq!(like_pattern("100%_a"), r"%100\%\_a%");
    }

    #[test]
    fn test_exif_column_typing() {
        assert!(matches!(
            exif_from_column(Some(r#"{"Make": "Canon"}"#.into())),
            Some(ExifBlob::Structured(_))
        ));
        assert!(matches!(
            exif_from_column(Some("{'Make': 'Canon'}".into())),
            Some(ExifBlob::Text(_))
        ));
        assert_eq!(exif_from_column(None), None);
    }

    #[test]
    fn test_ping_in_memory() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.ping().unwrap();
        assert_eq!(catalog.count().unwrap(), 0);
    }
}
