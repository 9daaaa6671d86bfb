use crate::error::{MediaBrowserError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// カタログDBパスの環境変数（設定ファイルより優先）
pub const CATALOG_ENV: &str = "MEDIA_BROWSER_CATALOG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// カタログDB（SQLite）のパス。未設定ならデータディレクトリ
    pub catalog_path: Option<PathBuf>,
    /// 相対パスを解決するディスクラベル
    pub disk_label: String,
    /// 1ページあたりの取得件数
    pub batch_size: usize,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// サムネイルキャッシュの最大件数
    pub thumbnail_cache_capacity: usize,
    /// ピクセルデータの合計上限（バイト）。未設定なら件数のみで制限
    pub thumbnail_cache_bytes: Option<usize>,
    pub hide_without_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: None,
            disk_label: "X:".into(),
            batch_size: 100,
            thumbnail_width: 30,
            thumbnail_height: 30,
            thumbnail_cache_capacity: 4096,
            thumbnail_cache_bytes: None,
            hide_without_preview: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Ok(Self::load_from(&config_path))
    }

    /// 指定パスから読み込み
    ///
    /// 壊れた設定ファイルは `.json.bak` に退避してデフォルトを使う。
    pub fn load_from(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Self::default();
        }

        let parsed = std::fs::read_to_string(config_path)
            .map_err(MediaBrowserError::from)
            .and_then(|content| serde_json::from_str::<Config>(&content).map_err(Into::into));

        match parsed {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Error loading config {}: {}", config_path.display(), e);
                let backup = config_path.with_extension("json.bak");
                if let Err(e) = std::fs::rename(config_path, &backup) {
                    log::warn!("Could not back up broken config: {}", e);
                }
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| MediaBrowserError::Config("Home directory not found".into()))?;
        Ok(home.join(".mediabrowser").join("config.json"))
    }

    /// カタログDBのパス
    ///
    /// 優先順位: 環境変数 → 設定ファイル → データディレクトリ
    pub fn catalog_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CATALOG_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        if let Some(path) = &self.catalog_path {
            return Ok(path.clone());
        }

        let data = dirs::data_dir()
            .ok_or_else(|| MediaBrowserError::Config("Data directory not found".into()))?;
        Ok(data.join("media-browser").join("catalog.db"))
    }

    pub fn thumbnail_size(&self) -> (u32, u32) {
        (self.thumbnail_width.max(1), self.thumbnail_height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.disk_label, "X:");
        assert!(config.hide_without_preview);
        assert_eq!(config.thumbnail_size(), (30, 30));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            disk_label: "D:".into(),
            batch_size: 50,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.disk_label, "D:");
        assert_eq!(loaded.batch_size, 50);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"disk_label": "Z:"}"#).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.disk_label, "Z:");
        assert_eq!(loaded.batch_size, 100);
    }

    #[test]
    fn test_broken_file_backed_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.batch_size, 100);
        assert!(!path.exists());
        assert!(dir.path().join("config.json.bak").exists());
    }
}
