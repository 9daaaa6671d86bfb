use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "media-browser")]
#[command(about = "メディアカタログ閲覧ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// カタログDBのパス（設定・環境変数より優先）
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像フォルダをカタログに取り込む
    Ingest {
        /// 画像フォルダのパス
        #[arg(required = true)]
        folder: PathBuf,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// カタログを一覧表示（スクロール相当でページを読み進める）
    Browse {
        /// 検索語（キャプション・EXIF・相対パスの部分一致）
        #[arg(short, long, default_value = "")]
        search: String,

        /// プレビューのない行も表示
        #[arg(long)]
        all: bool,

        /// 読み込むページ数の上限
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },

    /// 1件の詳細（キャプション・EXIF）を表示し、プレビューを書き出す
    Show {
        /// 行のID（絶対パス）
        #[arg(required = true)]
        id: String,

        /// 向き補正済みプレビューの出力先（PNG/JPEG）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 書き出し時の表示領域（px、余白込み）
        #[arg(long, default_value = "800")]
        max: u32,

        /// 縮小せずに書き出す
        #[arg(long)]
        full: bool,
    },

    /// EXIF列の解釈を診断
    Exif {
        #[arg(required = true)]
        id: String,
    },

    /// 行の相対パスをディスク上のパスに解決
    Locate {
        #[arg(required = true)]
        id: String,
    },

    /// 設定の表示・変更
    Config {
        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// カタログDBのパスを設定
        #[arg(long)]
        set_catalog: Option<PathBuf>,

        /// ディスクラベルを設定
        #[arg(long)]
        disk_label: Option<String>,
    },
}
