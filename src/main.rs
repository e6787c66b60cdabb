use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use seichi_updater::{catalog, cli, config, context, enrich, error, ingest, merger};

use catalog::CatalogStore;
use cli::{Cli, Commands};
use config::Config;
use context::RunContext;
use error::Result;
use merger::MergeStatus;

/// CLI指定 > 設定ファイルの順でディレクトリを決める
fn resolve_store(config: &Config, base_dir: Option<PathBuf>, root_dir: Option<PathBuf>) -> CatalogStore {
    let base = base_dir.unwrap_or_else(|| PathBuf::from(&config.base_dir));
    let root = root_dir.unwrap_or_else(|| PathBuf::from(&config.root_dir));
    CatalogStore::new(base, root)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Reconcile {
            input,
            base_dir,
            root_dir,
            max_anime,
            budget_minutes,
            dry_run,
        } => {
            println!("⛩️ seichi-updater - 候補の照合・マージ");
            println!("開始: {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
            if dry_run {
                println!("（ドライラン: 変更は保存されません）\n");
            }
            let store = resolve_store(&config, base_dir, root_dir);
            let deadline = budget_minutes.map(|m| Instant::now() + Duration::from_secs(m * 60));

            // 1. 候補読み込み
            println!("[1/3] 候補を読み込み中...");
            let candidates = ingest::load_candidates(&input)?;
            println!("✔ {}件の候補を検出\n", candidates.len());

            // 2. カタログ読み込み
            println!("[2/3] カタログを読み込み中...");
            let mut catalog = store.load_catalog()?;
            println!("✔ 既存{}作品\n", catalog.len());

            // 3. 照合・マージ
            println!("[3/3] 照合・マージ中...");
            let limit = max_anime.unwrap_or(usize::MAX);
            let mut summary = merger::RunSummary::default();
            for (i, candidate) in candidates.iter().enumerate() {
                if i >= limit {
                    summary.remaining = candidates.len() - i;
                    println!("処理上限（{limit}件）に達しました");
                    break;
                }
                if deadline.map_or(false, |d| Instant::now() >= d) {
                    summary.remaining = candidates.len() - i;
                    println!("実行期限に達したため中断します");
                    break;
                }

                println!("[{}/{}] {}", i + 1, candidates.len(), candidate.title);
                let outcome = merger::reconcile_candidate(&store, &mut catalog, candidate, dry_run)?;
                match &outcome.status {
                    MergeStatus::Created { local_id, points } => {
                        println!("  ✔ 新規登録: ID {local_id}（{points}点）");
                    }
                    MergeStatus::Updated {
                        local_id,
                        new_points,
                        skipped_duplicates,
                        ..
                    } => {
                        println!(
                            "  ✔ 更新: ID {local_id}（追加{new_points}点、重複除外{skipped_duplicates}点）"
                        );
                    }
                    MergeStatus::Unchanged { local_id } => {
                        println!("  - 変更なし: ID {local_id}");
                    }
                    MergeStatus::Failed { reason } => {
                        eprintln!("  ✗ 失敗: {reason}");
                    }
                }
                summary.record(outcome);
            }

            println!(
                "\n✅ 完了: 新規{} / 更新{} / 変更なし{} / 失敗{}",
                summary.created, summary.updated, summary.unchanged, summary.failed
            );
            if summary.remaining > 0 {
                println!("（未処理 {}件）", summary.remaining);
            }
        }

        Commands::Names {
            base_dir,
            root_dir,
            budget_minutes,
        } => {
            println!("🈶 seichi-updater - 中文名の補完\n");
            let store = resolve_store(&config, base_dir, root_dir);
            let ctx = Arc::new(RunContext::new(config, budget_minutes)?);

            let mut catalog = store.load_catalog()?;
            let summary = enrich::enrich_names(ctx, &store, &mut catalog).await?;
            println!(
                "\n✅ 完了: 対象{} / 更新{} / 失敗{} / 未処理{}",
                summary.candidates, summary.updated, summary.failed, summary.remaining
            );
        }

        Commands::Region {
            base_dir,
            root_dir,
            force,
            workers,
            budget_minutes,
        } => {
            println!("🗾 seichi-updater - 地域タグの補完\n");
            let store = resolve_store(&config, base_dir, root_dir);
            let ctx = Arc::new(RunContext::new(config, budget_minutes)?);

            let mut catalog = store.load_catalog()?;
            let summary = enrich::enrich_regions(ctx, &store, &mut catalog, force, workers).await?;
            println!(
                "\n✅ 完了: 対象{} / 更新{} / 失敗{} / 未処理{}",
                summary.candidates, summary.updated, summary.failed, summary.remaining
            );
        }

        Commands::Index { base_dir, root_dir } => {
            println!("🗂️ seichi-updater - index.json の再構築\n");
            let store = resolve_store(&config, base_dir, root_dir);

            println!("[1/2] フォルダを走査中...");
            let (catalog, summary) = catalog::rebuild_catalog(&store, cli.verbose)?;
            println!(
                "✔ {}フォルダを処理（更新{} / スキップ{}）\n",
                summary.processed, summary.updated, summary.skipped
            );

            println!("[2/2] index.json を保存中...");
            store.save_catalog(&catalog)?;
            println!("✔ 保存: {}", store.index_path().display());
            println!("✔ 保存: {}", store.root_index_path().display());

            println!("\n✅ 完了: {}作品", catalog.len());
        }

        Commands::Config {
            show,
            set_base_dir,
            set_rate_limit_ms,
        } => {
            let mut config = config;
            let mut changed = false;

            if let Some(dir) = set_base_dir {
                config.base_dir = dir;
                changed = true;
            }
            if let Some(ms) = set_rate_limit_ms {
                config.rate_limit_ms = ms;
                changed = true;
            }
            if changed {
                config.save()?;
                println!("✔ 設定を保存しました");
            }

            if show || !changed {
                println!("設定:");
                println!("  データディレクトリ: {}", config.base_dir);
                println!("  ルートディレクトリ: {}", config.root_dir);
                println!("  中文名API: {}", config.name_api_base);
                println!("  逆ジオコーディングAPI: {}", config.geocode_api_base);
                println!("  API呼び出し間隔: {}ms", config.rate_limit_ms);
                println!("  最大試行回数: {}", config.max_retries);
                println!("  連続失敗の上限: {}", config.max_consecutive_failures);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
            }
        }
    }

    Ok(())
}
