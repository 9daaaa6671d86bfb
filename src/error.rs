use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaBrowserError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Catalog store error: {0}")]
    Store(String),

    #[error("Image load error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("A catalog fetch is already in flight")]
    FetchInFlight,

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("No images found in {0}")]
    NoImagesFound(String),
}

pub type Result<T> = std::result::Result<T, MediaBrowserError>;

/// ステータス行に出すときの最大文字数
const STATUS_DETAIL_LIMIT: usize = 50;

impl MediaBrowserError {
    /// ステータス行向けの短いメッセージ
    ///
    /// 接続系のエラーは原因ごとに案内文へ置き換える。
    pub fn status_message(&self) -> String {
        match self {
            MediaBrowserError::Database(_) | MediaBrowserError::Store(_) => {
                let detail = self.to_string();
                let lower = detail.to_lowercase();
                if lower.contains("password authentication") {
                    "Authentication failed - check username/password".to_string()
                } else if lower.contains("connection refused") {
                    "Connection refused - check host/port".to_string()
                } else if lower.contains("does not exist") || lower.contains("unable to open database") {
                    "Database does not exist".to_string()
                } else {
                    format!("Database error: {}", truncate(&detail, STATUS_DETAIL_LIMIT))
                }
            }
            MediaBrowserError::FetchInFlight => "Loading...".to_string(),
            other => format!("Error: {}", truncate(&other.to_string(), STATUS_DETAIL_LIMIT)),
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let head: String = text.chars().take(limit).collect();
        format!("{}...", head)
    }
}
