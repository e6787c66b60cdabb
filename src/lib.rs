//! アニメ聖地巡礼データベースの照合・マージエンジン
//!
//! 外部スクレイパーが出力した候補レコードを、既存カタログ（index.json）に
//! 重複なく取り込むためのライブラリ。タイトル照合・座標重複判定・
//! マージ・永続化を担当する。スクレイピング自体と画像処理は対象外。

pub mod catalog;
pub mod cli;
pub mod config;
pub mod context;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod merger;
