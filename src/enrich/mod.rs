//! カタログの補完
//!
//! 外部APIでカタログの欠けている情報を埋める。
//! - `names` … 中文タイトルの補完（bgm.tv）
//! - `region` … 巡礼点の座標からの地域タグ付け（Nominatim）
//!
//! どちらも副作用のない検索だけを外部に投げ、カタログの更新と
//! 保存は単一スレッドで行う。

pub mod names;
pub mod region;

pub use names::enrich_names;
pub use region::enrich_regions;

/// 補完処理の集計
#[derive(Debug, Default)]
pub struct EnrichSummary {
    /// 対象になったエントリ数
    pub candidates: usize,
    /// 実際に更新したエントリ数
    pub updated: usize,
    /// API失敗などで更新できなかったエントリ数
    pub failed: usize,
    /// 期限超過やブレーカー作動で未処理のまま残った数
    pub remaining: usize,
}
