//! ページング制御
//!
//! オフセット・検索条件・「続きがあるか」を管理する純粋な状態機械。
//! 取得の開始は呼び出し側（セッション）が返されたクエリで行う。
//! 状態の変更は単一の消費側コンテキストからのみ行われる。

use media_browser_common::{CatalogQuery, PageResult};

/// スクロール位置がこの割合を超えたら次のページを要求する
pub const SCROLL_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pub offset: usize,
    /// 取得中（同時に1件まで）
    pub is_loading: bool,
    pub has_more: bool,
    /// 現在有効なクエリ。これと一致しない結果は古いものとして捨てる
    pub active_query: CatalogQuery,
}

/// 届いたページの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// 反映した。`first_page` なら既存の行を置き換える
    Applied { first_page: bool },
    /// 古いクエリの結果なので捨てた
    Stale,
}

#[derive(Debug, Clone)]
pub struct PaginationController {
    limit: usize,
    /// `begin_query` のたびに進める。同条件の読み直しでも前の取得と区別できる
    generation: u64,
    state: PaginationState,
}

impl PaginationController {
    pub fn new(limit: usize, hide_without_preview: bool) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            generation: 0,
            state: PaginationState {
                offset: 0,
                is_loading: false,
                has_more: true,
                active_query: CatalogQuery::new("", hide_without_preview, limit),
            },
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more
    }

    pub fn offset(&self) -> usize {
        self.state.offset
    }

    pub fn active_query(&self) -> &CatalogQuery {
        &self.state.active_query
    }

    pub fn search_term(&self) -> &str {
        &self.state.active_query.search_term
    }

    pub fn hide_without_preview(&self) -> bool {
        self.state.active_query.hide_without_preview
    }

    /// 新しい検索を開始
    ///
    /// オフセットを0に戻し、取得中の結果は以後すべて古いものになる。
    /// 返したクエリでちょうど1回取得すること。
    pub fn begin_query(&mut self, search_term: &str, hide_without_preview: bool) -> CatalogQuery {
        self.generation += 1;
        let query = CatalogQuery::new(search_term, hide_without_preview, self.limit)
            .with_generation(self.generation);
        log::debug!(
            "begin query: term='{}', hide_without_preview={}, generation={}",
            query.search_term,
            query.hide_without_preview,
            query.generation
        );

        self.state = PaginationState {
            offset: 0,
            is_loading: true,
            has_more: true,
            active_query: query.clone(),
        };
        query
    }

    /// 同じ条件で最初から読み直す
    pub fn reload(&mut self) -> CatalogQuery {
        let term = self.state.active_query.search_term.clone();
        let hide = self.state.active_query.hide_without_preview;
        self.begin_query(&term, hide)
    }

    /// プレビューなしの行を隠すかを切り替える（変化したときだけ読み直す）
    pub fn set_hide_without_preview(&mut self, hide: bool) -> Option<CatalogQuery> {
        if self.state.active_query.hide_without_preview == hide {
            return None;
        }
        let term = self.state.active_query.search_term.clone();
        Some(self.begin_query(&term, hide))
    }

    /// 次のページを要求
    ///
    /// 取得中、または続きがないときは何もしない。
    pub fn request_more(&mut self) -> Option<CatalogQuery> {
        if self.state.is_loading || !self.state.has_more {
            return None;
        }

        self.state.offset += self.limit;
        self.state.active_query.offset = self.state.offset;
        self.state.is_loading = true;
        log::debug!("request more: offset={}", self.state.offset);
        Some(self.state.active_query.clone())
    }

    /// スクロール位置（0.0〜1.0）の通知
    pub fn on_scroll_near_bottom(&mut self, fraction_scrolled: f64) -> Option<CatalogQuery> {
        if fraction_scrolled > SCROLL_THRESHOLD {
            self.request_more()
        } else {
            None
        }
    }

    /// ページが届いた
    pub fn on_page_arrived(&mut self, result: &PageResult, for_query: &CatalogQuery) -> PageOutcome {
        if *for_query != self.state.active_query {
            log::debug!(
                "discarding stale page (term='{}', offset={})",
                for_query.search_term,
                for_query.offset
            );
            return PageOutcome::Stale;
        }

        self.state.has_more = result.has_more;
        self.state.is_loading = false;
        PageOutcome::Applied {
            first_page: for_query.offset == 0,
        }
    }

    /// 取得が失敗した
    ///
    /// 有効なクエリの失敗なら取得中を解除し、追加ページの場合はオフセットを戻す
    /// （次のスクロールで同じページを取り直せる）。古いクエリなら何もしない。
    pub fn on_page_failed(&mut self, for_query: &CatalogQuery) -> bool {
        if *for_query != self.state.active_query {
            return false;
        }

        self.state.is_loading = false;
        if for_query.offset > 0 {
            self.state.offset = for_query.offset.saturating_sub(self.limit);
            self.state.active_query.offset = self.state.offset;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_browser_common::MediaRecord;

    fn page(len: usize, limit: usize) -> PageResult {
        PageResult::from_rows(vec![MediaRecord::default(); len], limit)
    }

    #[test]
    fn test_request_more_blocked_while_loading() {
        let mut pager = PaginationController::new(100, true);
        let first = pager.begin_query("", true);
        assert!(pager.request_more().is_none());

        assert_eq!(pager.on_page_arrived(&page(100, 100), &first), PageOutcome::Applied { first_page: true });
        let second = pager.request_more().unwrap();
        assert_eq!(second.offset, 100);
        assert!(pager.request_more().is_none());
    }

    #[test]
    fn test_scroll_threshold_is_exclusive() {
        let mut pager = PaginationController::new(10, false);
        let first = pager.begin_query("", false);
        pager.on_page_arrived(&page(10, 10), &first);

        assert!(pager.on_scroll_near_bottom(0.5).is_none());
        assert!(pager.on_scroll_near_bottom(0.9).is_none());
        assert!(pager.on_scroll_near_bottom(0.95).is_some());
    }

    #[test]
    fn test_failed_append_rolls_back_offset() {
        let mut pager = PaginationController::new(10, false);
        let first = pager.begin_query("cat", false);
        pager.on_page_arrived(&page(10, 10), &first);
        let second = pager.request_more().unwrap();

        assert!(pager.on_page_failed(&second));
        assert!(!pager.is_loading());
        assert_eq!(pager.offset(), 0);

        // 同じページをもう一度取りに行ける
        assert_eq!(pager.request_more(), Some(second));
    }

    #[test]
    fn test_set_hide_without_preview_only_on_change() {
        let mut pager = PaginationController::new(10, true);
        pager.begin_query("x", true);
        assert!(pager.set_hide_without_preview(true).is_none());

        let query = pager.set_hide_without_preview(false).unwrap();
        assert!(!query.hide_without_preview);
        assert_eq!(query.search_term, "x");
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn test_reload_supersedes_identical_query() {
        let mut pager = PaginationController::new(10, false);
        let first = pager.begin_query("", false);
        let reloaded = pager.reload();
        assert_eq!(first.search_term, reloaded.search_term);
        assert_ne!(first, reloaded);

        assert_eq!(pager.on_page_arrived(&page(10, 10), &first), PageOutcome::Stale);
        assert!(pager.is_loading());
        assert!(!pager.on_page_failed(&first));
        assert_eq!(
            pager.on_page_arrived(&page(10, 10), &reloaded),
            PageOutcome::Applied { first_page: true }
        );
    }
}
