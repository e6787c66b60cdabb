//! カタログのデータ型
//!
//! index.json のエントリ構造と巡礼点の型を定義する。
//! カタログは1回の照合パスの間だけメモリ上で可変借用され、
//! 変更はマージャーを通してのみ行われる。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SeichiError};

/// カバー画像から主題色を抽出できなかった場合の既定色
pub const DEFAULT_THEME_COLOR: &str = "#7f6a95";

/// 巡礼点（アニメに登場する実在の場所）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// 点位ID。`{local_id}-{連番}` 形式で、作品内で一意
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    /// 登場話数（"5" や "OP" など。空の場合あり）
    #[serde(default)]
    pub ep: String,
    /// [緯度, 経度]。成分のどちらかが 0 なら未解決のプレースホルダ
    pub geo: [f64; 2],
}

impl Point {
    /// 座標が解決済みかどうか。未解決の点は重複判定に参加しない
    pub fn has_resolved_geo(&self) -> bool {
        self.geo[0] != 0.0 && self.geo[1] != 0.0
    }
}

/// カタログエントリ（アニメ1作品分）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// 日本語タイトル（原語、正とするデータ）
    pub name: String,
    /// 中文タイトル。未取得の間は空か name と同値
    #[serde(default)]
    pub name_cn: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub theme_color: String,
    /// 巡礼点の順序付きリスト。追記のみで削除はしない
    pub points: Vec<Point>,
    /// 地域タグ（出現頻度の降順）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region: Vec<String>,
}

/// カタログ全体
///
/// ローカルIDの昇順で決定的に走査できるよう BTreeMap で保持する。
/// タイトル照合のタイブレークはこの走査順に依存する。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<u32, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// index.json のマップ（文字列キー）から変換する
    pub fn from_map(map: BTreeMap<String, CatalogEntry>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (key, entry) in map {
            let id: u32 = key
                .parse()
                .map_err(|_| SeichiError::CatalogLoad(format!("不正なローカルID: {key}")))?;
            entries.insert(id, entry);
        }
        Ok(Self { entries })
    }

    /// index.json 書き出し用のマップ（文字列キー）に変換する
    pub fn to_map(&self) -> BTreeMap<String, &CatalogEntry> {
        self.entries
            .iter()
            .map(|(id, entry)| (id.to_string(), entry))
            .collect()
    }

    /// ローカルIDの昇順で走査する
    pub fn iter(&self) -> impl Iterator<Item = (u32, &CatalogEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn get(&self, id: u32) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(&id)
    }

    /// 新しいエントリを登録する。ローカルIDは一度割り当てたら変更しない
    pub fn insert(&mut self, id: u32, entry: CatalogEntry) {
        self.entries.insert(id, entry);
    }

    /// カタログ内の最大ローカルID
    pub fn max_id(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            name_cn: String::new(),
            cover: String::new(),
            theme_color: DEFAULT_THEME_COLOR.to_string(),
            points: Vec::new(),
            region: Vec::new(),
        }
    }

    #[test]
    fn test_point_resolved_geo() {
        let mut point = Point {
            id: "1-1".to_string(),
            name: "渋谷駅".to_string(),
            image: String::new(),
            ep: String::new(),
            geo: [35.658, 139.701],
        };
        assert!(point.has_resolved_geo());

        point.geo = [0.0, 139.701];
        assert!(!point.has_resolved_geo());

        point.geo = [0.0, 0.0];
        assert!(!point.has_resolved_geo());
    }

    #[test]
    fn test_catalog_from_map_rejects_bad_key() {
        let mut map = BTreeMap::new();
        map.insert("abc".to_string(), entry("テスト"));
        assert!(Catalog::from_map(map).is_err());
    }

    #[test]
    fn test_catalog_iterates_in_id_order() {
        let mut map = BTreeMap::new();
        // 文字列キーの辞書順では "10" < "2" になるが、数値順で走査されること
        map.insert("10".to_string(), entry("作品10"));
        map.insert("2".to_string(), entry("作品2"));
        let catalog = Catalog::from_map(map).unwrap();

        let ids: Vec<u32> = catalog.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 10]);
        assert_eq!(catalog.max_id(), 10);
    }
}
