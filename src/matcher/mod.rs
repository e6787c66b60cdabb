//! 照合モジュール
//!
//! - タイトル照合: 候補タイトルが既存エントリに対応するかを判定
//! - 座標照合: 新しい巡礼点が既存の点と重複するかを判定

pub mod coord;
pub mod title;

pub use coord::{CoordSet, GridCoord};
pub use title::{match_title, normalize_title, MatchCandidate, MatchKind};
