//! index.json の再構築
//!
//! データディレクトリ直下の数字フォルダを走査し、各フォルダの
//! info.json / points.json から index.json を作り直す。既存の
//! index.json に値が入っているフィールドは、新しい値が空のとき
//! 上書きせずに残す（空で潰さない規則はマージと同じ）。

use walkdir::WalkDir;

use crate::catalog::store::CatalogStore;
use crate::catalog::types::{Catalog, CatalogEntry, DEFAULT_THEME_COLOR};
use crate::error::Result;

/// 再構築の集計
#[derive(Debug, Default)]
pub struct RebuildSummary {
    /// 走査したフォルダ数
    pub processed: usize,
    /// 更新または新規作成したエントリ数
    pub updated: usize,
    /// 名称が空などの理由で飛ばしたフォルダ数
    pub skipped: usize,
}

/// フォルダの内容から index.json を再構築する
///
/// 返り値のカタログは未保存。呼び出し側が `save_catalog` する。
pub fn rebuild_catalog(store: &CatalogStore, verbose: bool) -> Result<(Catalog, RebuildSummary)> {
    let original = store.load_catalog()?;
    let mut catalog = original.clone();
    let mut summary = RebuildSummary::default();

    let mut folder_ids: Vec<u32> = WalkDir::new(store.base_dir())
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| e.file_name().to_string_lossy().parse::<u32>().ok())
        .collect();
    folder_ids.sort_unstable();

    for local_id in folder_ids {
        summary.processed += 1;

        let info = match store.load_info(local_id) {
            Ok(info) => info,
            Err(e) => {
                // 入力エラーは記録して次のフォルダへ
                eprintln!("フォルダ {local_id} の info.json 読み込みに失敗: {e}");
                summary.skipped += 1;
                continue;
            }
        };
        let points = match store.load_points(local_id) {
            Ok(points) => points,
            Err(e) => {
                eprintln!("フォルダ {local_id} の points.json 読み込みに失敗: {e}");
                summary.skipped += 1;
                continue;
            }
        };

        let existing = original.get(local_id);

        // 新規エントリで名称が両方空なら登録しない
        if info.name.is_empty() && info.name_cn.is_empty() && existing.is_none() {
            if verbose {
                println!("  フォルダ {local_id}: 名称が空のためスキップ");
            }
            summary.skipped += 1;
            continue;
        }

        // 空フィールドは既存値を温存する
        let keep = |fresh: String, old: Option<&String>| -> String {
            if fresh.is_empty() {
                old.cloned().unwrap_or_default()
            } else {
                fresh
            }
        };
        let name = keep(info.name, existing.map(|e| &e.name));
        let name_cn = keep(info.name_cn, existing.map(|e| &e.name_cn));
        let cover = keep(info.cover, existing.map(|e| &e.cover));
        let mut theme_color = keep(info.theme_color, existing.map(|e| &e.theme_color));
        if theme_color.is_empty() {
            theme_color = DEFAULT_THEME_COLOR.to_string();
        }
        let region = if info.region.is_empty() {
            existing.map(|e| e.region.clone()).unwrap_or_default()
        } else {
            info.region
        };

        catalog.insert(
            local_id,
            CatalogEntry {
                name,
                name_cn,
                cover,
                theme_color,
                points,
                region,
            },
        );
        summary.updated += 1;
    }

    Ok((catalog, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::Point;
    use std::fs;

    fn write_folder(base: &std::path::Path, id: u32, info: &str, points: &str) {
        let dir = base.join(id.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("info.json"), info).unwrap();
        fs::write(dir.join("points.json"), points).unwrap();
    }

    #[test]
    fn test_rebuild_from_folders() {
        let temp = std::env::temp_dir().join("seichi-test-rebuild");
        fs::remove_dir_all(&temp).ok();
        let base = temp.join("data");
        fs::create_dir_all(&base).unwrap();

        write_folder(
            &base,
            3,
            r#"{"local_id": 3, "name": "テスト作品", "name_cn": "", "cover": "", "theme_color": "", "pointsLength": 1}"#,
            r#"{"points": [{"id": "3-1", "name": "駅", "geo": [35.0, 139.0]}]}"#,
        );

        let store = CatalogStore::new(&base, &temp);
        let (catalog, summary) = rebuild_catalog(&store, false).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.updated, 1);
        let entry = catalog.get(3).expect("エントリができているはず");
        assert_eq!(entry.name, "テスト作品");
        assert_eq!(entry.theme_color, DEFAULT_THEME_COLOR);
        assert_eq!(entry.points.len(), 1);

        fs::remove_dir_all(&temp).ok();
    }

    #[test]
    fn test_rebuild_preserves_populated_fields() {
        let temp = std::env::temp_dir().join("seichi-test-rebuild-keep");
        fs::remove_dir_all(&temp).ok();
        let base = temp.join("data");
        fs::create_dir_all(&base).unwrap();

        let store = CatalogStore::new(&base, &temp);

        // 既存カタログには中文名とカバーが入っている
        let mut catalog = Catalog::new();
        catalog.insert(
            7,
            CatalogEntry {
                name: "既存作品".to_string(),
                name_cn: "既存作品中文".to_string(),
                cover: "https://example.com/cover.jpg".to_string(),
                theme_color: "#123456".to_string(),
                points: vec![Point {
                    id: "7-1".to_string(),
                    name: "旧点".to_string(),
                    image: String::new(),
                    ep: String::new(),
                    geo: [35.0, 139.0],
                }],
                region: vec!["東京都".to_string()],
            },
        );
        store.save_catalog(&catalog).unwrap();

        // フォルダ側の info.json は名称以外が空
        write_folder(
            &base,
            7,
            r#"{"local_id": 7, "name": "既存作品", "name_cn": "", "cover": "", "theme_color": ""}"#,
            r#"{"points": [{"id": "7-1", "name": "旧点", "geo": [35.0, 139.0]}]}"#,
        );

        let (rebuilt, _) = rebuild_catalog(&store, false).unwrap();
        let entry = rebuilt.get(7).unwrap();
        assert_eq!(entry.name_cn, "既存作品中文");
        assert_eq!(entry.cover, "https://example.com/cover.jpg");
        assert_eq!(entry.theme_color, "#123456");
        assert_eq!(entry.region, vec!["東京都".to_string()]);

        fs::remove_dir_all(&temp).ok();
    }
}
