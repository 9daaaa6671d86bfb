//! サムネイルキャッシュ
//!
//! プレビューのバイト列のハッシュ、目標サイズ、EXIFの文字列表現をキーにして
//! デコード・向き補正・縮小済みの画像を保持する。
//! 同じ見た目になる要求は同じキーになる。

use crate::orientation;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use lru::LruCache;
use media_browser_common::ExifBlob;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// 生成済みサムネイル（キャッシュと表示側で共有）
pub type Thumbnail = Arc<DynamicImage>;

/// サムネイル生成の窓口
pub trait ThumbnailProvider {
    /// キャッシュにあればそれを、なければ生成して返す
    ///
    /// デコードできないバイト列は `None`（キャッシュしない）。
    fn get_or_create(
        &mut self,
        bytes: &[u8],
        target: (u32, u32),
        exif: Option<&ExifBlob>,
    ) -> Option<Thumbnail>;

    /// 全エントリを破棄
    fn clear(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThumbnailKey {
    pub fingerprint: String,
    pub width: u32,
    pub height: u32,
    pub exif: String,
}

impl ThumbnailKey {
    pub fn new(bytes: &[u8], target: (u32, u32), exif: Option<&ExifBlob>) -> Self {
        Self {
            fingerprint: fingerprint(bytes),
            width: target.0,
            height: target.1,
            exif: exif.map(ExifBlob::to_key_string).unwrap_or_default(),
        }
    }
}

/// キャッシュの統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// デコードを行った回数
    pub misses: u64,
    pub decode_failures: u64,
}

struct CacheEntry {
    image: Thumbnail,
    bytes: usize,
}

/// LRUで上限を持つサムネイルキャッシュ
///
/// 件数の上限に加えて、任意でピクセルデータのバイト数上限を持てる。
pub struct ThumbnailCache {
    entries: LruCache<ThumbnailKey, CacheEntry>,
    max_bytes: Option<usize>,
    bytes: usize,
    stats: CacheStats,
}

impl ThumbnailCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            max_bytes: None,
            bytes: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn with_byte_budget(capacity: usize, max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
            ..Self::new(capacity)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// 保持しているピクセルデータの合計
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    fn insert(&mut self, key: ThumbnailKey, image: Thumbnail) {
        let bytes = image.as_bytes().len();
        if let Some((_, evicted)) = self.entries.push(key, CacheEntry { image, bytes }) {
            self.bytes = self.bytes.saturating_sub(evicted.bytes);
        }
        self.bytes = self.bytes.saturating_add(bytes);

        if let Some(max_bytes) = self.max_bytes {
            // 直前に入れたものは残す
            while self.bytes > max_bytes && self.entries.len() > 1 {
                match self.entries.pop_lru() {
                    Some((_, evicted)) => self.bytes = self.bytes.saturating_sub(evicted.bytes),
                    None => break,
                }
            }
        }
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(4096)
    }
}

impl ThumbnailProvider for ThumbnailCache {
    fn get_or_create(
        &mut self,
        bytes: &[u8],
        target: (u32, u32),
        exif: Option<&ExifBlob>,
    ) -> Option<Thumbnail> {
        if bytes.is_empty() {
            return None;
        }

        let key = ThumbnailKey::new(bytes, target, exif);
        if let Some(entry) = self.entries.get(&key) {
            self.stats.hits += 1;
            return Some(Arc::clone(&entry.image));
        }

        self.stats.misses += 1;
        let decoded = match image::load_from_memory(bytes) {
            Ok(img) => img,
            Err(e) => {
                self.stats.decode_failures += 1;
                log::warn!("Error creating thumbnail: {}", e);
                return None;
            }
        };

        let oriented = orientation::normalize(decoded, exif);
        let (width, height) = oriented.dimensions();
        let (tw, th) = fit_dimensions(width, height, target.0, target.1);
        let thumbnail = Arc::new(oriented.resize_exact(tw, th, FilterType::Lanczos3));

        self.insert(key, Arc::clone(&thumbnail));
        Some(thumbnail)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.bytes = 0;
    }
}

/// 縦横比を保って目標サイズに収める寸法
///
/// 倍率は `min(tw/sw, th/sh)`、端数切り捨て、最小1px。
/// どちらの辺も目標を超えない。
pub fn fit_dimensions(src_width: u32, src_height: u32, target_width: u32, target_height: u32) -> (u32, u32) {
    let (sw, sh) = (src_width.max(1) as u64, src_height.max(1) as u64);
    let (tw, th) = (target_width.max(1) as u64, target_height.max(1) as u64);

    // 整数演算で比較（浮動小数の切り捨て誤差を避ける）
    let (w, h) = if tw * sh <= th * sw {
        (tw, sh * tw / sw)
    } else {
        (sw * th / sh, th)
    };
    (w.max(1) as u32, h.max(1) as u32)
}

/// バイト列の内容ハッシュ（SHA-256の先頭16バイト）
fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..16])
}
