//! カタログ永続化の統合テスト
//!
//! index.json の読み書き、形状ゆれの吸収、再構築を検証する

use seichi_updater::catalog::{
    rebuild_catalog, Catalog, CatalogEntry, CatalogStore, Point, DEFAULT_THEME_COLOR,
};
use tempfile::tempdir;

fn entry(name: &str, points: Vec<Point>) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        name_cn: String::new(),
        cover: String::new(),
        theme_color: DEFAULT_THEME_COLOR.to_string(),
        points,
        region: Vec::new(),
    }
}

fn point(id: &str, lat: f64, lng: f64) -> Point {
    Point {
        id: id.to_string(),
        name: "場所".to_string(),
        image: String::new(),
        ep: String::new(),
        geo: [lat, lng],
    }
}

/// index.json が無ければ空のカタログ
#[test]
fn test_load_missing_index_returns_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = CatalogStore::new(dir.path().join("data"), dir.path());

    let catalog = store.load_catalog().expect("読み込み失敗");
    assert!(catalog.is_empty());
}

/// 保存と再読み込みでカタログが一致する
#[test]
fn test_catalog_roundtrip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("data");
    std::fs::create_dir_all(&base).unwrap();
    let store = CatalogStore::new(&base, dir.path());

    let mut catalog = Catalog::new();
    catalog.insert(1, entry("作品A", vec![point("1-1", 35.0, 139.0)]));
    catalog.insert(12, entry("作品B", Vec::new()));
    store.save_catalog(&catalog).expect("保存失敗");

    let loaded = store.load_catalog().expect("再読み込み失敗");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get(1).unwrap().name, "作品A");
    assert_eq!(loaded.get(1).unwrap().points[0].geo, [35.0, 139.0]);
    assert_eq!(loaded.get(12).unwrap().name, "作品B");
}

/// points.json はどちらの形状でも読める
#[test]
fn test_load_points_both_shapes() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("data");
    let store = CatalogStore::new(&base, dir.path());

    std::fs::create_dir_all(base.join("1")).unwrap();
    std::fs::write(
        base.join("1").join("points.json"),
        r#"[{"id": "1-1", "name": "駅", "geo": [35.0, 139.0]}]"#,
    )
    .unwrap();
    assert_eq!(store.load_points(1).unwrap().len(), 1);

    std::fs::create_dir_all(base.join("2")).unwrap();
    std::fs::write(
        base.join("2").join("points.json"),
        r#"{"points": [{"id": "2-1", "name": "坂", "geo": [34.0, 135.0]}]}"#,
    )
    .unwrap();
    assert_eq!(store.load_points(2).unwrap().len(), 1);
}

/// フォルダの内容から index.json を作り直せる
#[test]
fn test_rebuild_then_save() {
    let dir = tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("data");
    let store = CatalogStore::new(&base, dir.path());

    let folder = base.join("5");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(
        folder.join("info.json"),
        r#"{"local_id": 5, "name": "再構築作品", "name_cn": "重建作品", "cover": "", "theme_color": "", "pointsLength": 1}"#,
    )
    .unwrap();
    std::fs::write(
        folder.join("points.json"),
        r#"{"points": [{"id": "5-1", "name": "駅", "geo": [35.0, 139.0]}]}"#,
    )
    .unwrap();

    let (catalog, summary) = rebuild_catalog(&store, false).expect("再構築失敗");
    assert_eq!(summary.updated, 1);
    store.save_catalog(&catalog).expect("保存失敗");

    let loaded = store.load_catalog().unwrap();
    let entry = loaded.get(5).expect("エントリがあるはず");
    assert_eq!(entry.name, "再構築作品");
    assert_eq!(entry.name_cn, "重建作品");
    assert_eq!(entry.theme_color, DEFAULT_THEME_COLOR);

    // 2コピーはバイト同一
    let primary = std::fs::read(store.index_path()).unwrap();
    let secondary = std::fs::read(store.root_index_path()).unwrap();
    assert_eq!(primary, secondary);
}

/// apiid.json は数値・文字列どちらの値でも読める
#[test]
fn test_load_apiid_tolerant_values() {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = CatalogStore::new(dir.path().join("data"), dir.path());

    std::fs::write(store.apiid_path(), r#"{"1": 100, "2": "200"}"#).unwrap();
    let map = store.load_apiid().expect("読み込み失敗");
    assert_eq!(map.get(&1), Some(&100));
    assert_eq!(map.get(&2), Some(&200));
}
