//! カタログの永続化
//!
//! index.json はデータディレクトリ直下とルートの2箇所に保持し、
//! 常にバイト同一に保つ。マージ成功のたびに全体を書き直す
//! （追記や部分書き込みはしない）。
//!
//! - `<base_dir>/index.json` と `<root_dir>/index.json` … カタログ本体
//! - `<root_dir>/apiid.json` … ローカルID→外部APIIDの対応（読み取り専用）
//! - `<base_dir>/<local_id>/info.json` / `points.json` … 作品ごとの記録

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::types::{Catalog, CatalogEntry, Point};
use crate::error::{Result, SeichiError};

const INDEX_FILE: &str = "index.json";
const APIID_FILE: &str = "apiid.json";
const INFO_FILE: &str = "info.json";
const POINTS_FILE: &str = "points.json";

/// points.json の形状ゆれ（素の配列 / {"points": [...]}）を吸収する読み込み形
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointsFile {
    Nested { points: Vec<Point> },
    Bare(Vec<Point>),
}

/// points.json の書き出し形。常に {"points": [...]} で統一する
#[derive(Debug, Serialize)]
struct PointsFileOut<'a> {
    points: &'a [Point],
}

/// info.json の内容（カタログエントリの部分集合）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InfoFile {
    #[serde(default)]
    pub local_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_cn: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub theme_color: String,
    #[serde(rename = "pointsLength", default)]
    pub points_length: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region: Vec<String>,
}

/// カタログ一式のオンディスク表現
#[derive(Debug, Clone)]
pub struct CatalogStore {
    base_dir: PathBuf,
    root_dir: PathBuf,
}

impl CatalogStore {
    pub fn new(base_dir: impl Into<PathBuf>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            root_dir: root_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir.join(INDEX_FILE)
    }

    pub fn root_index_path(&self) -> PathBuf {
        self.root_dir.join(INDEX_FILE)
    }

    pub fn apiid_path(&self) -> PathBuf {
        self.root_dir.join(APIID_FILE)
    }

    pub fn anime_dir(&self, local_id: u32) -> PathBuf {
        self.base_dir.join(local_id.to_string())
    }

    /// カタログを読み込む。index.json が無ければ空のカタログを返す
    pub fn load_catalog(&self) -> Result<Catalog> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Catalog::new());
        }
        let content = fs::read_to_string(&path)?;
        let map: BTreeMap<String, CatalogEntry> = serde_json::from_str(&content)
            .map_err(|e| SeichiError::CatalogLoad(format!("{}: {e}", path.display())))?;
        Catalog::from_map(map)
    }

    /// カタログ全体を2箇所に書き出す
    ///
    /// 一時ファイルに書いて flush → rename する。2コピーのどちらかが
    /// 書けなければエラーを返し、操作全体を失敗として扱う。
    pub fn save_catalog(&self, catalog: &Catalog) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        fs::create_dir_all(&self.root_dir)?;

        let json = serde_json::to_string_pretty(&catalog.to_map())?;

        // 2コピーとも先に一時ファイルへ書き切ってから rename する
        let targets = [self.index_path(), self.root_index_path()];
        let mut temps = Vec::with_capacity(targets.len());
        for target in &targets {
            let temp = write_temp(target, json.as_bytes())
                .map_err(|e| SeichiError::CatalogSave(format!("{}: {e}", target.display())))?;
            temps.push(temp);
        }
        for (temp, target) in temps.iter().zip(&targets) {
            fs::rename(temp, target)
                .map_err(|e| SeichiError::CatalogSave(format!("{}: {e}", target.display())))?;
        }
        Ok(())
    }

    /// apiid.json を読み込む。存在しなければ空のマップを返す
    ///
    /// エンジンからは読み取り専用で、次のローカルID算出にだけ使う。
    pub fn load_apiid(&self) -> Result<BTreeMap<u32, u64>> {
        let path = self.apiid_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path)?;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)?;

        let mut map = BTreeMap::new();
        for (key, value) in raw {
            let local_id: u32 = key
                .parse()
                .map_err(|_| SeichiError::CatalogLoad(format!("apiid.json の不正なキー: {key}")))?;
            let api_id = value
                .as_u64()
                .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| {
                    SeichiError::CatalogLoad(format!("apiid.json の不正な値: {key} -> {value}"))
                })?;
            map.insert(local_id, api_id);
        }
        Ok(map)
    }

    /// 次に割り当てるローカルID
    ///
    /// カタログ内の最大ID、apiid.json 内の最大ID、データディレクトリの
    /// 数字フォルダ名の最大値、のいずれよりも必ず大きい値を返す。
    pub fn next_local_id(&self, catalog: &Catalog) -> Result<u32> {
        let apiid_max = self.load_apiid()?.keys().next_back().copied().unwrap_or(0);
        let folder_max = self.max_folder_id();
        Ok(catalog.max_id().max(apiid_max).max(folder_max) + 1)
    }

    /// データディレクトリ直下の数字フォルダ名の最大値
    fn max_folder_id(&self) -> u32 {
        WalkDir::new(&self.base_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| e.file_name().to_string_lossy().parse::<u32>().ok())
            .max()
            .unwrap_or(0)
    }

    /// 作品フォルダの存在を確認する。既存作品のマージではフォルダが
    /// 無ければ失敗として報告する（黙ってスキップしない）
    pub fn require_anime_dir(&self, local_id: u32) -> Result<()> {
        let dir = self.anime_dir(local_id);
        if !dir.is_dir() {
            return Err(SeichiError::FolderNotFound(dir.display().to_string()));
        }
        Ok(())
    }

    /// 作品の points.json を読み込む。どちらの形状でも受け付ける
    pub fn load_points(&self, local_id: u32) -> Result<Vec<Point>> {
        let path = self.anime_dir(local_id).join(POINTS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let file: PointsFile = serde_json::from_str(&content)
            .map_err(|e| SeichiError::CatalogLoad(format!("{}: {e}", path.display())))?;
        Ok(match file {
            PointsFile::Nested { points } => points,
            PointsFile::Bare(points) => points,
        })
    }

    /// 作品の info.json を読み込む。無ければ既定値
    pub fn load_info(&self, local_id: u32) -> Result<InfoFile> {
        let path = self.anime_dir(local_id).join(INFO_FILE);
        if !path.exists() {
            return Ok(InfoFile::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 作品フォルダの info.json / points.json をカタログと整合させる
    ///
    /// マージ成功のたびに呼ばれ、カタログ側のエントリ内容で上書きする。
    pub fn save_entry_files(&self, local_id: u32, entry: &CatalogEntry) -> Result<()> {
        let dir = self.anime_dir(local_id);
        fs::create_dir_all(&dir)?;

        let info = InfoFile {
            local_id,
            name: entry.name.clone(),
            name_cn: entry.name_cn.clone(),
            cover: entry.cover.clone(),
            theme_color: entry.theme_color.clone(),
            points_length: entry.points.len(),
            region: entry.region.clone(),
        };
        let info_json = serde_json::to_string_pretty(&info)?;
        let info_path = dir.join(INFO_FILE);
        let temp = write_temp(&info_path, info_json.as_bytes())?;
        fs::rename(&temp, &info_path)?;

        let points_json = serde_json::to_string_pretty(&PointsFileOut {
            points: &entry.points,
        })?;
        let points_path = dir.join(POINTS_FILE);
        let temp = write_temp(&points_path, points_json.as_bytes())?;
        fs::rename(&temp, &points_path)?;

        Ok(())
    }
}

/// 目的パスの隣に一時ファイルを書き、flush と fsync まで済ませて返す
fn write_temp(target: &Path, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let temp = target.with_extension("json.tmp");
    let mut file = File::create(&temp)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()?;
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_file_accepts_both_shapes() {
        let bare = r#"[{"id": "1-1", "name": "駅前", "geo": [35.0, 139.0]}]"#;
        let nested = r#"{"points": [{"id": "1-1", "name": "駅前", "geo": [35.0, 139.0]}]}"#;

        let parsed: PointsFile = serde_json::from_str(bare).unwrap();
        let PointsFile::Bare(points) = parsed else {
            panic!("素の配列として解釈されるはず");
        };
        assert_eq!(points.len(), 1);

        let parsed: PointsFile = serde_json::from_str(nested).unwrap();
        let PointsFile::Nested { points } = parsed else {
            panic!("points プロパティ付きとして解釈されるはず");
        };
        assert_eq!(points[0].name, "駅前");
    }
}
