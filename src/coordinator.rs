//! 非同期ロード調整
//!
//! ページ取得と詳細取得をtokioのブロッキングプールで実行し、
//! 結果を有界チャネルで消費側へ返す。消費側は自分の手番で
//! `try_next` / `next` を呼んで受け取る。
//!
//! ページ取得は同時に1件まで。取得中の `submit` は拒否し、
//! `replace` は最新の1件だけを保留して、結果の受け取り時に開始する。

use crate::catalog::CatalogStore;
use crate::error::{MediaBrowserError, Result};
use crate::orientation;
use crate::thumbnail::decode_preview;
use image::DynamicImage;
use media_browser_common::{parse_exif, CatalogQuery, ExifProperties, MediaDetail, PageResult};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 64;

/// ワーカーが組み立てた詳細表示
#[derive(Debug, Clone)]
pub struct DetailPreview {
    pub detail: MediaDetail,
    pub properties: ExifProperties,
    /// 向き補正済みのプレビュー（なし・デコード失敗は `None`）
    pub image: Option<DynamicImage>,
}

/// ワーカーから届く結果
#[derive(Debug)]
pub enum LoadEvent {
    Page {
        query: CatalogQuery,
        outcome: Result<PageResult>,
    },
    Detail {
        id: String,
        outcome: Result<DetailPreview>,
    },
}

pub struct LoadCoordinator {
    store: Arc<dyn CatalogStore>,
    runtime: Handle,
    tx: mpsc::Sender<LoadEvent>,
    rx: mpsc::Receiver<LoadEvent>,
    outstanding: Option<CatalogQuery>,
    pending: Option<CatalogQuery>,
    details_in_flight: usize,
}

impl LoadCoordinator {
    /// 現在のtokioランタイム上に作成
    pub fn new(store: Arc<dyn CatalogStore>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| MediaBrowserError::Runtime(e.to_string()))?;
        Ok(Self::with_handle(store, runtime))
    }

    pub fn with_handle(store: Arc<dyn CatalogStore>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            store,
            runtime,
            tx,
            rx,
            outstanding: None,
            pending: None,
            details_in_flight: 0,
        }
    }

    /// ページ取得を開始（取得中なら `FetchInFlight`）
    pub fn submit(&mut self, query: CatalogQuery) -> Result<()> {
        if self.outstanding.is_some() {
            return Err(MediaBrowserError::FetchInFlight);
        }
        self.start_page(query);
        Ok(())
    }

    /// ページ取得を開始、取得中なら保留（保留中のものは置き換える）
    pub fn replace(&mut self, query: CatalogQuery) {
        if self.outstanding.is_some() {
            log::debug!("fetch in flight, parking query (offset={})", query.offset);
            self.pending = Some(query);
        } else {
            self.start_page(query);
        }
    }

    /// 1件分の詳細を取得（ページ取得とは独立に並行する）
    pub fn fetch_detail(&mut self, id: &str) {
        self.details_in_flight += 1;
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let id = id.to_string();

        self.runtime.spawn_blocking(move || {
            let outcome = load_detail(store.as_ref(), &id);
            if tx.blocking_send(LoadEvent::Detail { id, outcome }).is_err() {
                log::debug!("consumer gone, dropping detail result");
            }
        });
    }

    fn start_page(&mut self, query: CatalogQuery) {
        self.outstanding = Some(query.clone());
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();

        self.runtime.spawn_blocking(move || {
            let outcome = store
                .fetch_page(&query)
                .map(|rows| PageResult::from_rows(rows, query.limit));
            if tx.blocking_send(LoadEvent::Page { query, outcome }).is_err() {
                log::debug!("consumer gone, dropping page result");
            }
        });
    }

    /// 受け取ったイベントで内部状態を進める
    fn settle(&mut self, event: &LoadEvent) {
        match event {
            LoadEvent::Page { .. } => {
                self.outstanding = None;
                if let Some(query) = self.pending.take() {
                    self.start_page(query);
                }
            }
            LoadEvent::Detail { .. } => {
                self.details_in_flight = self.details_in_flight.saturating_sub(1);
            }
        }
    }

    /// 届いている結果があれば1件受け取る（待たない）
    pub fn try_next(&mut self) -> Option<LoadEvent> {
        let event = self.rx.try_recv().ok()?;
        self.settle(&event);
        Some(event)
    }

    /// 次の結果を待つ。何も取得していなければ `None`
    pub async fn next(&mut self) -> Option<LoadEvent> {
        if self.is_idle() {
            return self.try_next();
        }
        let event = self.rx.recv().await?;
        self.settle(&event);
        Some(event)
    }

    pub fn is_page_in_flight(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn details_in_flight(&self) -> usize {
        self.details_in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding.is_none() && self.pending.is_none() && self.details_in_flight == 0
    }
}

/// 詳細取得（ワーカー側）: 再取得、EXIFパース、デコード、向き補正
fn load_detail(store: &dyn CatalogStore, id: &str) -> Result<DetailPreview> {
    let detail = store
        .fetch_detail(id)?
        .ok_or_else(|| MediaBrowserError::RecordNotFound(id.to_string()))?;

    let properties = parse_exif(detail.exif.as_ref()).into_properties();
    let image = match detail.preview_bytes.as_deref() {
        Some(bytes) if !bytes.is_empty() => match decode_preview(bytes, None) {
            Ok(image) => Some(orientation::apply(image, &properties)),
            Err(e) => {
                log::warn!("Could not decode preview for {}: {}", id, e);
                None
            }
        },
        _ => None,
    };

    Ok(DetailPreview {
        detail,
        properties,
        image,
    })
}
