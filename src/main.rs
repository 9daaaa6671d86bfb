use anyhow::Context;
use clap::Parser;
use media_browser::catalog::{CatalogStore, SqliteCatalog};
use media_browser::{cli, config, error, paths, report, scanner, session, thumbnail};
use cli::{Cli, Commands};
use config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut config = Config::load()?;
    let catalog_override = cli.catalog.clone();

    match cli.command {
        Commands::Ingest { folder, recursive } => {
            println!("📥 media-browser - 取り込み\n");
            let catalog = open_catalog(&config, catalog_override.as_deref())?;

            println!("[1/2] 画像をスキャン・プレビュー作成中...");
            let inserted = scanner::ingest_folder(&catalog, &folder, recursive)?;
            println!("✔ {}件を登録", inserted);

            println!("[2/2] カタログ件数を確認中...");
            println!("✔ カタログ合計: {}件", catalog.count()?);
        }

        Commands::Browse { search, all, pages } => {
            let catalog = open_catalog(&config, catalog_override.as_deref())?;
            let mut session = session::BrowserSession::new(catalog, &config)?;

            let hide = config.hide_without_preview && !all;
            session.begin_query(&search, hide);
            session.wait_idle().await;

            for _ in 1..pages.max(1) {
                if !session.pager().has_more() {
                    break;
                }
                // 末尾までスクロールしたのと同じ
                session.on_scroll(1.0);
                session.wait_idle().await;
            }

            for row in session.rows() {
                let thumb = row
                    .thumbnail
                    .as_ref()
                    .map(|t| format!("{}x{}", t.width(), t.height()))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>7}  {}  {}",
                    thumb,
                    row.record.relative_path,
                    row.record.caption.as_deref().unwrap_or("")
                );
            }
            println!("\n{}", session.status());
        }

        Commands::Show { id, output, max, full } => {
            let catalog = open_catalog(&config, catalog_override.as_deref())?;
            let mut session = session::BrowserSession::new(catalog, &config)?;

            session.select(&id);
            session.wait_detail().await;

            let Some(detail) = session.detail() else {
                anyhow::bail!("{}", session.status());
            };

            println!("{}", session.status());
            println!("Caption: {}", detail.caption);
            println!("EXIF:");
            for (label, value) in &detail.exif_rows {
                println!("  {}: {}", label, value);
            }

            if let Some(output) = output {
                let Some(image) = detail.image.clone() else {
                    anyhow::bail!("No preview available");
                };
                let image = if full {
                    image
                } else {
                    thumbnail::fit_preview(image, max, max)
                };
                image
                    .save(&output)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                println!("✔ プレビューを保存: {}", output.display());
            }
        }

        Commands::Exif { id } => {
            let catalog = open_catalog(&config, catalog_override.as_deref())?;
            let detail = catalog
                .fetch_detail(&id)?
                .ok_or_else(|| error::MediaBrowserError::RecordNotFound(id.clone()))?;
            println!("{}", report::detail_report(&detail));
        }

        Commands::Locate { id } => {
            let catalog = open_catalog(&config, catalog_override.as_deref())?;
            let detail = catalog
                .fetch_detail(&id)?
                .ok_or_else(|| error::MediaBrowserError::RecordNotFound(id.clone()))?;

            let ctx = paths::PathContext::new(config.disk_label.clone());
            let path = ctx.resolve(&detail.relative_path);
            if path.exists() {
                println!("{}", path.display());
            } else {
                println!("{} (Path not found)", path.display());
            }
        }

        Commands::Config { show, set_catalog, disk_label } => {
            let mut changed = false;

            if let Some(path) = set_catalog {
                config.catalog_path = Some(path);
                changed = true;
            }
            if let Some(label) = disk_label {
                config.disk_label = label;
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  カタログ: {}", catalog_display(&config));
                println!("  ディスクラベル: {}", config.disk_label);
                println!("  ページサイズ: {}", config.batch_size);
                println!("  サムネイル: {}x{}", config.thumbnail_width, config.thumbnail_height);
                println!("  キャッシュ上限: {}件", config.thumbnail_cache_capacity);
                println!(
                    "  プレビューなしを隠す: {}",
                    if config.hide_without_preview { "はい" } else { "いいえ" }
                );
            }
        }
    }

    Ok(())
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// `--catalog` があればそれを、なければ設定のパスを開く
fn open_catalog(config: &Config, path_override: Option<&Path>) -> anyhow::Result<Arc<SqliteCatalog>> {
    let path = match path_override {
        Some(path) => path.to_path_buf(),
        None => config.catalog_path()?,
    };
    let catalog = SqliteCatalog::open(&path)
        .with_context(|| format!("Failed to open catalog {}", path.display()))?;
    catalog.ping().map_err(|e| anyhow::anyhow!(e.status_message()))?;
    Ok(Arc::new(catalog))
}

fn catalog_display(config: &Config) -> String {
    config
        .catalog_path()
        .map(|p: PathBuf| p.display().to_string())
        .unwrap_or_else(|e| e.to_string())
}
