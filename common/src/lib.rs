//! Media Browser Common Library
//!
//! カタログ閲覧セッションとCLIで共有される型とユーティリティ
//! （画像処理・DBに依存しない部分）

pub mod display;
pub mod error;
pub mod exif;
pub mod literal;
pub mod types;

pub use display::{display_rows, NO_EXIF_ROW};
pub use error::{Error, Result};
pub use exif::{parse_exif, parse_exif_text, ExifParse, ExifProperties, ExifValue, ParseStrategy};
pub use literal::parse_literal;
pub use types::{CatalogQuery, ExifBlob, MediaDetail, MediaRecord, PageResult};
