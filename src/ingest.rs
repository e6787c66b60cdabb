//! 候補レコードの取り込み
//!
//! 外部スクレイパーが出力した候補JSONを読み込み、形状ゆれを
//! この層で正規形に直してからコアロジックへ渡す。
//!
//! - 点リスト: 素の配列 / `{"points": [...]}` の両方を受ける
//! - 座標: `geo` 配列、または地図URLからの抽出
//!
//! コアロジック（照合・マージ）は正規形しか扱わず、形状で分岐しない。

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, SeichiError};

/// スクレイパー出力の候補バッチ
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBatch {
    Bare(Vec<RawCandidate>),
    Nested { candidates: Vec<RawCandidate> },
}

/// 候補1件（正規化前）
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    #[serde(default)]
    pub name_cn: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub theme_color: String,
    #[serde(default)]
    pub points: RawPointList,
}

/// 点リストの形状ゆれを受けるデシリアライズ形
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPointList {
    Nested { points: Vec<RawPoint> },
    Bare(Vec<RawPoint>),
}

impl Default for RawPointList {
    fn default() -> Self {
        RawPointList::Bare(Vec::new())
    }
}

impl RawPointList {
    fn into_vec(self) -> Vec<RawPoint> {
        match self {
            RawPointList::Nested { points } => points,
            RawPointList::Bare(points) => points,
        }
    }
}

/// 巡礼点1件（正規化前）
#[derive(Debug, Clone, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ep: String,
    #[serde(default)]
    pub image: String,
    /// [緯度, 経度]。無い場合は map_url から抽出を試みる
    #[serde(default)]
    pub geo: Option<[f64; 2]>,
    /// 座標がURLにしか含まれない場合の地図リンク
    #[serde(default)]
    pub map_url: Option<String>,
}

/// 正規化済み候補。以降の処理はこの形だけを扱う
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub name_cn: String,
    pub cover: String,
    pub theme_color: String,
    pub points: Vec<ScrapedPoint>,
}

/// 正規化済みの巡礼点（ID割り当て前）
#[derive(Debug, Clone)]
pub struct ScrapedPoint {
    pub name: String,
    pub ep: String,
    pub image: String,
    pub geo: [f64; 2],
}

/// 候補ファイルを読み込んで正規化する
///
/// タイトルが空の候補と座標源を持たない点は、記録して飛ばす
/// （入力エラーでパス全体は止めない）。
pub fn load_candidates(path: &Path) -> Result<Vec<Candidate>> {
    if !path.exists() {
        return Err(SeichiError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let batch: RawBatch = serde_json::from_str(&content)
        .map_err(|e| SeichiError::InvalidCandidate(format!("{}: {e}", path.display())))?;
    let raw = match batch {
        RawBatch::Bare(candidates) => candidates,
        RawBatch::Nested { candidates } => candidates,
    };

    let mut candidates = Vec::with_capacity(raw.len());
    for (i, candidate) in raw.into_iter().enumerate() {
        match normalize_candidate(candidate) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => eprintln!("候補 {} を飛ばします: {e}", i + 1),
        }
    }
    Ok(candidates)
}

/// 1候補を正規形に変換する
pub fn normalize_candidate(raw: RawCandidate) -> Result<Candidate> {
    if raw.title.trim().is_empty() {
        return Err(SeichiError::InvalidCandidate("タイトルが空".to_string()));
    }

    let mut points = Vec::new();
    for raw_point in raw.points.into_vec() {
        match resolve_geo(&raw_point) {
            Some(geo) => points.push(ScrapedPoint {
                name: if raw_point.name.is_empty() {
                    "Unknown Location".to_string()
                } else {
                    raw_point.name
                },
                ep: raw_point.ep,
                image: raw_point.image,
                geo,
            }),
            None => {
                eprintln!(
                    "  点位 '{}' を飛ばします: 座標を特定できません",
                    raw_point.name
                );
            }
        }
    }

    Ok(Candidate {
        title: raw.title.trim().to_string(),
        name_cn: raw.name_cn,
        cover: raw.cover,
        theme_color: raw.theme_color,
        points,
    })
}

/// 点の座標を決定する
///
/// geo 配列が明示されていればそのまま使う（(0,0) のプレースホルダも
/// 上流が明示した値として保持する）。無ければ地図URLから抽出する。
fn resolve_geo(point: &RawPoint) -> Option<[f64; 2]> {
    if let Some(geo) = point.geo {
        return Some(geo);
    }
    point
        .map_url
        .as_deref()
        .and_then(extract_coords_from_url)
        .map(|(lat, lng)| [lat, lng])
}

lazy_static! {
    /// 地図URLから座標を拾うパターン群。上から順に試す
    static ref COORD_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"destination=(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"[?&]q=(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"@(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"ll=(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"query=(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"center=(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"daddr=(-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
        Regex::new(r"loc[:=](-?\d+\.\d+),(-?\d+\.\d+)").unwrap(),
    ];
    static ref DECIMAL_RE: Regex = Regex::new(r"-?\d+\.\d+").unwrap();
}

/// 地図URLから座標を抽出する
///
/// 既知のクエリパラメータを順に試し、どれにも当たらなければ
/// URL中の最初の2つの小数を拾って緯度経度の範囲検証だけ行う。
pub fn extract_coords_from_url(url: &str) -> Option<(f64, f64)> {
    // URL内の余分な空白はスクレイピング由来のノイズなので除去
    let url = url.replace(' ', "");

    for pattern in COORD_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(&url) {
            let lat: f64 = caps[1].parse().ok()?;
            let lng: f64 = caps[2].parse().ok()?;
            return Some((lat, lng));
        }
    }

    // フォールバック: 最初の2つの小数を候補とする
    let decimals: Vec<f64> = DECIMAL_RE
        .find_iter(&url)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if decimals.len() >= 2 {
        let (lat, lng) = (decimals[0], decimals[1]);
        if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
            return Some((lat, lng));
        }
    }
    None
}
