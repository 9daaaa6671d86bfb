//! 閲覧セッション
//!
//! 単一の消費側コンテキスト。ページング状態・ロード調整・サムネイルキャッシュ・
//! 読み込み済みの行・選択・詳細表示・ステータス行を所有し、
//! ワーカーの結果は自分の手番（`process_events` / `next_event`）でだけ反映する。

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::coordinator::{DetailPreview, LoadCoordinator, LoadEvent};
use crate::error::{MediaBrowserError, Result};
use crate::pagination::{PageOutcome, PaginationController};
use crate::paths::PathContext;
use crate::thumbnail::{Thumbnail, ThumbnailCache, ThumbnailProvider};
use image::DynamicImage;
use media_browser_common::types::short_name;
use media_browser_common::{display_rows, CatalogQuery, MediaRecord, PageResult, NO_EXIF_ROW};
use std::path::PathBuf;
use std::sync::Arc;

/// 一覧の1行（サムネイル付き）
#[derive(Debug, Clone)]
pub struct BrowserRow {
    pub record: MediaRecord,
    /// プレビューなし・デコード失敗は `None`
    pub thumbnail: Option<Thumbnail>,
}

/// 選択中の1件の表示内容
#[derive(Debug, Clone)]
pub struct DetailView {
    pub absolute_id: String,
    pub relative_path: String,
    pub caption: String,
    pub exif_rows: Vec<(String, String)>,
    pub image: Option<DynamicImage>,
}

impl From<DetailPreview> for DetailView {
    fn from(preview: DetailPreview) -> Self {
        let mut exif_rows = display_rows(&preview.properties);
        if exif_rows.is_empty() {
            exif_rows.push((NO_EXIF_ROW.0.to_string(), NO_EXIF_ROW.1.to_string()));
        }

        let detail = preview.detail;
        Self {
            caption: detail
                .caption
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "No caption".to_string()),
            absolute_id: detail.absolute_id,
            relative_path: detail.relative_path,
            exif_rows,
            image: preview.image,
        }
    }
}

pub struct BrowserSession<C: ThumbnailProvider = ThumbnailCache> {
    pager: PaginationController,
    coordinator: LoadCoordinator,
    cache: C,
    thumbnail_size: (u32, u32),
    rows: Vec<BrowserRow>,
    selected: Option<String>,
    detail: Option<DetailView>,
    status: String,
}

impl BrowserSession<ThumbnailCache> {
    /// 設定に従ってセッションを作成（tokioランタイム上で呼ぶこと）
    pub fn new(store: Arc<dyn CatalogStore>, config: &Config) -> Result<Self> {
        let cache = match config.thumbnail_cache_bytes {
            Some(max_bytes) => ThumbnailCache::with_byte_budget(config.thumbnail_cache_capacity, max_bytes),
            None => ThumbnailCache::new(config.thumbnail_cache_capacity),
        };
        Self::with_cache(store, config, cache)
    }
}

impl<C: ThumbnailProvider> BrowserSession<C> {
    pub fn with_cache(store: Arc<dyn CatalogStore>, config: &Config, cache: C) -> Result<Self> {
        Ok(Self {
            pager: PaginationController::new(config.batch_size, config.hide_without_preview),
            coordinator: LoadCoordinator::new(store)?,
            cache,
            thumbnail_size: config.thumbnail_size(),
            rows: Vec::new(),
            selected: None,
            detail: None,
            status: "Ready".to_string(),
        })
    }

    pub fn rows(&self) -> &[BrowserRow] {
        &self.rows
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn pager(&self) -> &PaginationController {
        &self.pager
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    /// 新しい検索を開始（キャッシュ・行・選択はリセット）
    pub fn begin_query(&mut self, search_term: &str, hide_without_preview: bool) {
        let query = self.pager.begin_query(search_term, hide_without_preview);
        self.restart(query);
    }

    pub fn clear_search(&mut self) {
        let hide = self.pager.hide_without_preview();
        self.begin_query("", hide);
    }

    pub fn reload(&mut self) {
        let query = self.pager.reload();
        self.restart(query);
    }

    pub fn set_hide_without_preview(&mut self, hide: bool) {
        if let Some(query) = self.pager.set_hide_without_preview(hide) {
            self.restart(query);
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.status = "Cache cleared".to_string();
    }

    pub fn on_scroll(&mut self, fraction_scrolled: f64) {
        if let Some(query) = self.pager.on_scroll_near_bottom(fraction_scrolled) {
            self.submit(query);
        }
    }

    pub fn request_more(&mut self) {
        if let Some(query) = self.pager.request_more() {
            self.submit(query);
        }
    }

    /// 行を選択して詳細を取得
    pub fn select(&mut self, absolute_id: &str) {
        self.selected = Some(absolute_id.to_string());
        self.detail = None;
        self.coordinator.fetch_detail(absolute_id);
    }

    /// 選択中の行のディスク上のパス
    pub fn selected_path(&self, ctx: &PathContext) -> Option<PathBuf> {
        let selected = self.selected.as_deref()?;
        if let Some(detail) = self.detail.as_ref().filter(|d| d.absolute_id == selected) {
            return Some(ctx.resolve(&detail.relative_path));
        }
        self.rows
            .iter()
            .find(|row| row.record.absolute_id == selected)
            .map(|row| ctx.resolve(&row.record.relative_path))
    }

    /// 届いている結果をすべて反映（待たない）。反映した件数を返す
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.coordinator.try_next() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// 次の結果を待って反映。待つものがなければ `false`
    pub async fn next_event(&mut self) -> bool {
        match self.coordinator.next().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// ページ取得・詳細取得がすべて終わるまで反映を続ける
    pub async fn wait_idle(&mut self) {
        while self.next_event().await {}
    }

    /// 詳細取得が終わるまで反映を続ける
    pub async fn wait_detail(&mut self) {
        while self.coordinator.details_in_flight() > 0 {
            if !self.next_event().await {
                break;
            }
        }
    }

    fn restart(&mut self, query: CatalogQuery) {
        self.cache.clear();
        self.rows.clear();
        self.selected = None;
        self.detail = None;
        self.status = "Loading...".to_string();
        self.coordinator.replace(query);
    }

    fn submit(&mut self, query: CatalogQuery) {
        if let Err(e) = self.coordinator.submit(query.clone()) {
            log::warn!("could not start fetch: {}", e);
            self.pager.on_page_failed(&query);
            self.status = e.status_message();
        } else {
            self.status = "Loading more...".to_string();
        }
    }

    fn handle(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Page { query, outcome } => match outcome {
                Ok(page) => self.apply_page(page, &query),
                Err(e) => self.fail_page(e, &query),
            },
            LoadEvent::Detail { id, outcome } => {
                if self.selected.as_deref() != Some(id.as_str()) {
                    log::debug!("discarding detail for deselected row {}", id);
                    return;
                }
                match outcome {
                    Ok(preview) => {
                        self.status = format!("Preview: {}", short_name(&preview.detail.absolute_id));
                        self.detail = Some(DetailView::from(preview));
                    }
                    Err(e) => {
                        log::warn!("preview failed for {}: {}", id, e);
                        self.status = format!("Preview error: {}", e);
                    }
                }
            }
        }
    }

    fn apply_page(&mut self, page: PageResult, query: &CatalogQuery) {
        let first_page = match self.pager.on_page_arrived(&page, query) {
            PageOutcome::Stale => return,
            PageOutcome::Applied { first_page } => first_page,
        };
        if first_page {
            self.rows.clear();
        }

        for record in page.rows {
            let thumbnail = record.preview_bytes.as_deref().and_then(|bytes| {
                self.cache
                    .get_or_create(bytes, self.thumbnail_size, record.exif.as_ref())
            });
            self.rows.push(BrowserRow { record, thumbnail });
        }

        log::info!("loaded {} rows (offset={})", self.rows.len(), query.offset);
        self.status = self.status_line();
    }

    fn fail_page(&mut self, error: MediaBrowserError, query: &CatalogQuery) {
        if self.pager.on_page_failed(query) {
            log::error!("Error loading data: {}", error);
            self.status = error.status_message();
        }
    }

    /// `Loaded N images [for 'term'] [(no previews hidden)] [(scroll to load more)]`
    fn status_line(&self) -> String {
        let mut parts = vec![format!("Loaded {} images", self.rows.len())];
        let term = self.pager.search_term();
        if !term.is_empty() {
            parts.push(format!("for '{}'", term));
        }
        if self.pager.hide_without_preview() {
            parts.push("(no previews hidden)".to_string());
        }
        if self.pager.has_more() {
            parts.push("(scroll to load more)".to_string());
        }
        parts.join(" ")
    }
}
