//! カタログストア
//!
//! ページ取得と1件取得だけを行う読み取り専用の窓口。
//! ワーカースレッドから呼ばれるため `Send + Sync` を要求する。

mod sqlite;

pub use sqlite::SqliteCatalog;

use crate::error::Result;
use media_browser_common::{CatalogQuery, MediaDetail, MediaRecord};

pub trait CatalogStore: Send + Sync {
    /// 1ページ分の行を取得
    ///
    /// - 相対パスの降順（ページングで重複・欠落が出ない安定順）
    /// - 検索語はキャプション・EXIF文字列・相対パスの部分一致（大文字小文字無視、OR）
    /// - `hide_without_preview` ならプレビューのない行をクエリ内で除外
    fn fetch_page(&self, query: &CatalogQuery) -> Result<Vec<MediaRecord>>;

    /// 選択された1件を再取得
    fn fetch_detail(&self, absolute_id: &str) -> Result<Option<MediaDetail>>;
}
