//! 地域タグの補完
//!
//! 各作品の巡礼点を逆ジオコーディングして、作品に地域タグ
//! （都道府県など）を付ける。検索は副作用がないので作品単位で
//! 並行に投げるが、カタログの更新と保存は呼び出し側スレッドで行う。
//!
//! 同じあたりの座標を何度も引かないよう、丸めた座標をキーに
//! 結果を実行内で共有キャッシュする。

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::catalog::{Catalog, CatalogStore};
use crate::context::RunContext;
use crate::enrich::EnrichSummary;
use crate::error::Result;

/// キャッシュのキー解像度（1e-3 度 ≒ 100m）
const CACHE_SCALE: f64 = 1000.0;

/// 逆ジオコーディングで地名を引くときのズーム（市区町村レベル）
const REVERSE_ZOOM: u32 = 10;

/// 地域名の優先順位。都道府県 → 市区町村 → より細かい区分の順
const ADMIN_LEVELS: [&str; 6] = ["level4", "level6", "level8", "level5", "level7", "level3"];

type RegionCache = Arc<Mutex<HashMap<(i64, i64), Option<String>>>>;

fn cache_key(lat: f64, lng: f64) -> (i64, i64) {
    ((lat * CACHE_SCALE).round() as i64, (lng * CACHE_SCALE).round() as i64)
}

/// geocodejson レスポンスから地域名を取り出す
///
/// admin の各レベルを優先順で試し、無ければ地物名、最後に
/// label の先頭要素で妥協する。
fn extract_region(value: &serde_json::Value) -> Option<String> {
    let geocoding = value
        .get("features")?
        .as_array()?
        .first()?
        .get("properties")?
        .get("geocoding")?;

    if let Some(admin) = geocoding.get("admin") {
        for level in ADMIN_LEVELS {
            if let Some(name) = admin.get(level).and_then(|v| v.as_str()) {
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
    }
    if let Some(name) = geocoding.get("name").and_then(|v| v.as_str()) {
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    geocoding
        .get("label")
        .and_then(|v| v.as_str())
        .and_then(|label| label.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 1点の座標から地域名を引く。結果はキャッシュ経由
async fn lookup_region(
    ctx: &RunContext,
    cache: &RegionCache,
    lat: f64,
    lng: f64,
) -> Option<String> {
    let key = cache_key(lat, lng);
    if let Some(cached) = cache.lock().await.get(&key) {
        return cached.clone();
    }

    let url = format!(
        "{}/reverse?format=geocodejson&lat={lat}&lon={lng}&zoom={REVERSE_ZOOM}&accept-language=ja",
        ctx.config.geocode_api_base
    );
    let region = match ctx.get_json(&url).await {
        Ok(value) => extract_region(&value),
        Err(e) => {
            eprintln!("  逆ジオコーディング失敗 ({lat}, {lng}): {e}");
            None
        }
    };

    cache.lock().await.insert(key, region.clone());
    region
}

/// 点ごとの地域名を出現頻度の降順に並べた一覧にまとめる
///
/// 同数の場合は初出順を保つ。
fn rank_regions(found: Vec<String>) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for region in found {
        match counts.iter_mut().find(|(name, _)| *name == region) {
            Some((_, count)) => *count += 1,
            None => counts.push((region, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(name, _)| name).collect()
}

/// 作品1件分の地域名を集める（並行タスクの本体）
async fn collect_entry_regions(
    ctx: Arc<RunContext>,
    cache: RegionCache,
    local_id: u32,
    geos: Vec<[f64; 2]>,
) -> (u32, Vec<String>) {
    let mut found = Vec::new();
    for geo in geos {
        if ctx.breaker.is_open() || ctx.deadline_exceeded() {
            break;
        }
        if let Some(region) = lookup_region(&ctx, &cache, geo[0], geo[1]).await {
            found.push(region);
        }
    }
    (local_id, rank_regions(found))
}

/// カタログ全体の地域タグを補完する
///
/// `force` でなければ region が既に付いている作品は飛ばす。
pub async fn enrich_regions(
    ctx: Arc<RunContext>,
    store: &CatalogStore,
    catalog: &mut Catalog,
    force: bool,
    workers: usize,
) -> Result<EnrichSummary> {
    let targets: Vec<(u32, Vec<[f64; 2]>)> = catalog
        .iter()
        .filter(|(_, e)| force || e.region.is_empty())
        .map(|(id, e)| {
            let geos = e
                .points
                .iter()
                .filter(|p| p.has_resolved_geo())
                .map(|p| p.geo)
                .collect::<Vec<_>>();
            (id, geos)
        })
        .filter(|(_, geos)| !geos.is_empty())
        .collect();

    let mut summary = EnrichSummary {
        candidates: targets.len(),
        ..Default::default()
    };
    if targets.is_empty() {
        println!("地域タグの補完対象はありません");
        return Ok(summary);
    }
    println!("地域タグを補完します（{}作品、並行数 {workers}）", targets.len());

    let progress = ProgressBar::new(targets.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let cache: RegionCache = Arc::new(Mutex::new(HashMap::new()));
    let mut tasks = JoinSet::new();
    let mut queue = targets.into_iter();
    let mut updated_ids = Vec::new();

    // 常に workers 件までタスクを走らせ、終わった分を反映して補充する
    loop {
        while tasks.len() < workers.max(1) {
            if ctx.breaker.is_open() || ctx.deadline_exceeded() {
                break;
            }
            let Some((local_id, geos)) = queue.next() else {
                break;
            };
            tasks.spawn(collect_entry_regions(
                Arc::clone(&ctx),
                Arc::clone(&cache),
                local_id,
                geos,
            ));
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        progress.inc(1);
        match joined {
            Ok((local_id, regions)) => {
                if regions.is_empty() {
                    summary.failed += 1;
                } else if let Some(entry) = catalog.get_mut(local_id) {
                    progress.set_message(regions.join("・"));
                    entry.region = regions;
                    updated_ids.push(local_id);
                    summary.updated += 1;
                }
            }
            Err(e) => {
                eprintln!("地域タグの取得タスクが失敗: {e}");
                summary.failed += 1;
            }
        }
    }
    progress.finish_and_clear();

    summary.remaining = queue.count();
    if summary.remaining > 0 {
        println!("{}作品を未処理のまま中断しました", summary.remaining);
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
