//! サムネイル生成モジュール
//!
//! - cache: 内容ハッシュ + サイズ + EXIFをキーにしたLRUキャッシュ
//! - preview: 詳細表示用の縮小（拡大はしない）

pub mod cache;
pub mod preview;

pub use cache::{fit_dimensions, CacheStats, Thumbnail, ThumbnailCache, ThumbnailKey, ThumbnailProvider};
pub use preview::{decode_preview, fit_preview, PREVIEW_MARGIN};
