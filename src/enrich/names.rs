//! 中文タイトルの補完
//!
//! name_cn が空、または日本語名と同じ値で埋まっているエントリを
//! 対象に、bgm.tv の検索APIで中文名を引いて埋める。
//! 検索は1件ずつ順に行い、途中で止まっても処理済み分は保存される。

use std::sync::Arc;

use crate::catalog::{Catalog, CatalogStore};
use crate::context::RunContext;
use crate::enrich::EnrichSummary;
use crate::error::{Result, SeichiError};

/// name_cn の補完が必要かどうか
fn needs_name_cn(name: &str, name_cn: &str) -> bool {
    name_cn.is_empty() || name_cn == name
}

/// 検索URLを組み立てる。タイトルはパスセグメントとしてエンコードする
fn search_url(base: &str, title: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| SeichiError::Config(format!("name_api_base が不正: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SeichiError::Config("name_api_base が不正".into()))?
        .extend(["search", "subject", title]);
    url.query_pairs_mut()
        .append_pair("type", "1")
        .append_pair("responseGroup", "small");
    Ok(url.to_string())
}

/// 検索レスポンスから最初の空でない name_cn を取り出す
fn pick_name_cn(value: &serde_json::Value) -> Option<String> {
    value
        .get("list")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("name_cn")?.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// カタログ全体の中文名を補完する
///
/// 更新があればカタログと対象フォルダを保存して返す。
pub async fn enrich_names(
    ctx: Arc<RunContext>,
    store: &CatalogStore,
    catalog: &mut Catalog,
) -> Result<EnrichSummary> {
    let targets: Vec<(u32, String)> = catalog
        .iter()
        .filter(|(_, e)| !e.name.is_empty() && needs_name_cn(&e.name, &e.name_cn))
        .map(|(id, e)| (id, e.name.clone()))
        .collect();

    let mut summary = EnrichSummary {
        candidates: targets.len(),
        ..Default::default()
    };
    if targets.is_empty() {
        println!("中文名の補完対象はありません");
        return Ok(summary);
    }
    println!("中文名を補完します（{}件）", targets.len());

    let mut updated_ids = Vec::new();
    for (i, (local_id, name)) in targets.iter().enumerate() {
        if ctx.deadline_exceeded() {
            println!("実行期限に達したため中断します");
            summary.remaining = targets.len() - i;
            break;
        }
        if ctx.breaker.is_open() {
            println!("連続失敗が多すぎるため中断します");
            summary.remaining = targets.len() - i;
            break;
        }

        let url = search_url(&ctx.config.name_api_base, name)?;
        match ctx.get_json(&url).await {
            Ok(value) => match pick_name_cn(&value) {
                Some(name_cn) => {
                    println!("  [{}/{}] {} -> {}", i + 1, targets.len(), name, name_cn);
                    if let Some(entry) = catalog.get_mut(*local_id) {
                        entry.name_cn = name_cn;
                        updated_ids.push(*local_id);
                        summary.updated += 1;
                    }
                }
                None => {
                    println!("  [{}/{}] {} -> 中文名なし", i + 1, targets.len(), name);
                }
            },
            Err(e) => {
                eprintln!("  [{}/{}] {} の検索に失敗: {e}", i + 1, targets.len(), name);
                summary.failed += 1;
            }
        }
    }

    if !updated_ids.is_empty() {
        store.save_catalog(catalog)?;
        for local_id in updated_ids {
            if let Some(entry) = catalog.get(local_id) {
                store.save_entry_files(local_id, entry)?;
            }
        }
    }
    Ok(summary)
}
