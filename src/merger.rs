//! レコードマージ
//!
//! 候補1件をカタログへ取り込む中心ロジック。タイトル照合の結果に
//! 応じて既存作品への追記（ケースB）か新規作品の登録（ケースA）に
//! 分岐し、成功するたびにカタログと作品フォルダを永続化する。
//!
//! エラーの扱い:
//! - 作品単位の問題（フォルダ欠落など）は `MergeStatus::Failed` として
//!   返し、パス全体は続行する
//! - カタログ本体の保存失敗は回復不能なので `Err` で伝播し、
//!   呼び出し側がパスを中断する

use crate::catalog::{Catalog, CatalogEntry, CatalogStore, Point, DEFAULT_THEME_COLOR};
use crate::error::{Result, SeichiError};
use crate::ingest::Candidate;
use crate::matcher::{match_title, CoordSet, GridCoord, MatchKind};

/// 候補1件のマージ結果
#[derive(Debug)]
pub struct MergeOutcome {
    /// 候補のタイトル（報告用）
    pub title: String,
    pub status: MergeStatus,
}

/// マージの結末
#[derive(Debug)]
pub enum MergeStatus {
    /// 新規作品として登録した
    Created { local_id: u32, points: usize },
    /// 既存作品に追記した
    Updated {
        local_id: u32,
        new_points: usize,
        skipped_duplicates: usize,
        fields_updated: bool,
    },
    /// 既存作品に一致したが追加すべき変更がなかった
    Unchanged { local_id: u32 },
    /// この候補は処理できなかった（パスは続行する）
    Failed { reason: String },
}

impl MergeStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, MergeStatus::Failed { .. })
    }
}

/// 1回の照合パス全体の集計
///
/// 後段（通知など）へそのまま渡せるよう、件数と個々の結果の
/// 両方を持つ。
#[derive(Debug, Default)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// 上限や期限で処理せずに残した候補数
    pub remaining: usize,
    pub outcomes: Vec<MergeOutcome>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome.status {
            MergeStatus::Created { .. } => self.created += 1,
            MergeStatus::Updated { .. } => self.updated += 1,
            MergeStatus::Unchanged { .. } => self.unchanged += 1,
            MergeStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// 候補1件をカタログへ取り込む
///
/// 成功時はカタログ（メモリ上）を更新し、`dry_run` でなければ
/// index.json 2箇所と作品フォルダも書き戻す。
pub fn reconcile_candidate(
    store: &CatalogStore,
    catalog: &mut Catalog,
    candidate: &Candidate,
    dry_run: bool,
) -> Result<MergeOutcome> {
    let status = match match_title(catalog, &candidate.title) {
        Some(matched) => {
            if matched.kind != MatchKind::Exact {
                println!(
                    "  既存作品と照合: '{}' -> ID {} ({:.1}点)",
                    candidate.title, matched.local_id, matched.score
                );
            }
            update_existing(store, catalog, matched.local_id, candidate, dry_run)?
        }
        None => create_new(store, catalog, candidate, dry_run)?,
    };

    Ok(MergeOutcome {
        title: candidate.title.clone(),
        status,
    })
}

/// ケースA: 新規作品として登録する
///
/// ローカルIDを採番し、候補の点すべてに `{local_id}-{連番}` のIDを
/// 振る。バッチ内の座標重複はここでも除外するが、上流が明示した
/// 未解決座標 (0,0) の点はプレースホルダとして保持する。
fn create_new(
    store: &CatalogStore,
    catalog: &mut Catalog,
    candidate: &Candidate,
    dry_run: bool,
) -> Result<MergeStatus> {
    let local_id = store.next_local_id(catalog)?;

    let mut coords = CoordSet::default();
    let mut points = Vec::new();
    for scraped in &candidate.points {
        match GridCoord::from_geo(scraped.geo[0], scraped.geo[1]) {
            Some(coord) => {
                if coords.is_duplicate(coord) {
                    println!("  点位 '{}' を除外: バッチ内で座標が重複", scraped.name);
                    continue;
                }
                coords.insert(coord);
            }
            // 未解決座標はそのまま登録する（重複判定には参加しない）
            None => {}
        }
        points.push(Point {
            id: format!("{}-{}", local_id, points.len() + 1),
            name: scraped.name.clone(),
            image: scraped.image.clone(),
            ep: scraped.ep.clone(),
            geo: scraped.geo,
        });
    }

    let theme_color = if candidate.theme_color.is_empty() {
        DEFAULT_THEME_COLOR.to_string()
    } else {
        candidate.theme_color.clone()
    };
    let entry = CatalogEntry {
        name: candidate.title.clone(),
        name_cn: candidate.name_cn.clone(),
        cover: candidate.cover.clone(),
        theme_color,
        points,
        region: Vec::new(),
    };
    let point_count = entry.points.len();

    if !dry_run {
        catalog.insert(local_id, entry);
        persist(store, catalog, local_id)?;
    }

    Ok(MergeStatus::Created {
        local_id,
        points: point_count,
    })
}

/// ケースB: 既存作品へ追記する
///
/// 既存の全点から座標セットを作り、重複しない新点だけを末尾に
/// 追加する。点IDは既存の点数の続きから振る。メタデータは
/// 既存値が空で候補が値を持つ場合にだけ埋める（空で潰さない）。
fn update_existing(
    store: &CatalogStore,
    catalog: &mut Catalog,
    local_id: u32,
    candidate: &Candidate,
    dry_run: bool,
) -> Result<MergeStatus> {
    // 既存作品のフォルダが無いのはデータ不整合。黙って飛ばさず報告する
    if let Err(e) = store.require_anime_dir(local_id) {
        return Ok(MergeStatus::Failed {
            reason: e.to_string(),
        });
    }

    let Some(existing) = catalog.get(local_id) else {
        return Ok(MergeStatus::Failed {
            reason: format!("カタログにID {local_id} のエントリがありません"),
        });
    };
    let mut entry = existing.clone();

    let mut coords = CoordSet::from_points(&entry.points);
    let mut new_points = 0usize;
    let mut skipped_duplicates = 0usize;
    for scraped in &candidate.points {
        let Some(coord) = GridCoord::from_geo(scraped.geo[0], scraped.geo[1]) else {
            // 既存作品への追記では未解決座標の点は受け入れない
            println!("  点位 '{}' を除外: 座標が未解決", scraped.name);
            continue;
        };
        if coords.is_duplicate(coord) {
            skipped_duplicates += 1;
            continue;
        }
        coords.insert(coord);
        entry.points.push(Point {
            id: format!("{}-{}", local_id, entry.points.len() + 1),
            name: scraped.name.clone(),
            image: scraped.image.clone(),
            ep: scraped.ep.clone(),
            geo: scraped.geo,
        });
        new_points += 1;
    }

    // 空のフィールドだけを候補の値で埋める
    let mut fields_updated = false;
    let mut fill = |slot: &mut String, value: &str| {
        if slot.is_empty() && !value.is_empty() {
            *slot = value.to_string();
            fields_updated = true;
        }
    };
    fill(&mut entry.name_cn, &candidate.name_cn);
    fill(&mut entry.cover, &candidate.cover);
    fill(&mut entry.theme_color, &candidate.theme_color);

    if new_points == 0 && !fields_updated {
        return Ok(MergeStatus::Unchanged { local_id });
    }

    if !dry_run {
        catalog.insert(local_id, entry);
        persist(store, catalog, local_id)?;
    }

    Ok(MergeStatus::Updated {
        local_id,
        new_points,
        skipped_duplicates,
        fields_updated,
    })
}

/// カタログ2箇所と作品フォルダを書き戻す
///
/// index.json の保存失敗はパス全体を中断すべき致命エラー。
fn persist(store: &CatalogStore, catalog: &Catalog, local_id: u32) -> Result<()> {
    store.save_catalog(catalog)?;
    let entry = catalog
        .get(local_id)
        .ok_or_else(|| SeichiError::CatalogSave(format!("保存対象のID {local_id} が消えています")))?;
    store.save_entry_files(local_id, entry)?;
    Ok(())
}
