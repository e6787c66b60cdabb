use crate::error::{Result, SeichiError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 作品フォルダと index.json を置くデータディレクトリ
    pub base_dir: String,
    /// ルート側 index.json と apiid.json を置くディレクトリ
    pub root_dir: String,
    /// 中文名検索APIのベースURL
    pub name_api_base: String,
    /// 逆ジオコーディングAPIのベースURL
    pub geocode_api_base: String,
    /// API呼び出し間の最小間隔（ミリ秒）
    pub rate_limit_ms: u64,
    /// 一時エラー時の最大試行回数
    pub max_retries: u32,
    /// この回数連続で失敗したら外部APIの呼び出しを打ち切る
    pub max_consecutive_failures: u32,
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: "pic/data".into(),
            root_dir: ".".into(),
            name_api_base: "https://api.bgm.tv".into(),
            geocode_api_base: "https://nominatim.openstreetmap.org".into(),
            rate_limit_ms: 1000,
            max_retries: 3,
            max_consecutive_failures: 10,
            timeout_seconds: 30,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SeichiError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("seichi-updater").join("config.json"))
    }
}
