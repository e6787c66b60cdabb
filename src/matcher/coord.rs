//! 座標照合
//!
//! 新しい巡礼点の座標が既存の点と重複するかを判定する。
//! 座標は5桁（約1.1m）に丸めて比較し、丸め後の完全一致に加えて
//! 緯度・経度とも 0.0001 度（約11m）未満の近接も重複とみなす。

use std::collections::HashSet;

use crate::catalog::Point;

/// 1e-5 度 = 丸め精度の1単位
const SCALE: f64 = 100_000.0;

/// 重複とみなす近接閾値（度）
pub const DUP_THRESHOLD_DEG: f64 = 0.0001;
/// 同閾値の 1e-5 度単位表現
const DUP_THRESHOLD_UNITS: i64 = (DUP_THRESHOLD_DEG * SCALE) as i64;

/// 5桁丸め後の座標。1e-5 度単位の整数で保持し、浮動小数の
/// 等値比較を避ける
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    lat: i64,
    lng: i64,
}

impl GridCoord {
    /// 生の座標から作る。成分のどちらかが 0 なら未解決としてNone
    pub fn from_geo(lat: f64, lng: f64) -> Option<Self> {
        if lat == 0.0 || lng == 0.0 {
            return None;
        }
        Some(Self {
            lat: (lat * SCALE).round() as i64,
            lng: (lng * SCALE).round() as i64,
        })
    }

    fn near(&self, other: &Self) -> bool {
        (self.lat - other.lat).abs() < DUP_THRESHOLD_UNITS
            && (self.lng - other.lng).abs() < DUP_THRESHOLD_UNITS
    }
}

/// 1回の照合パスで使う座標の作業セット
///
/// 既存の点から構築し、受け入れた新点を即座に追加することで、
/// 同一バッチ内の後続点ともカタログとも重複判定できる。
#[derive(Debug, Default)]
pub struct CoordSet {
    coords: HashSet<GridCoord>,
}

impl CoordSet {
    /// 既存の点リストから作業セットを構築する。未解決座標は入らない
    pub fn from_points(points: &[Point]) -> Self {
        let coords = points
            .iter()
            .filter_map(|p| GridCoord::from_geo(p.geo[0], p.geo[1]))
            .collect();
        Self { coords }
    }

    /// 重複判定
    ///
    /// まず丸め後の完全一致、次にいずれかの既存座標との近接を調べる。
    /// 最初に一致した時点で打ち切る。
    pub fn is_duplicate(&self, coord: GridCoord) -> bool {
        if self.coords.contains(&coord) {
            return true;
        }
        self.coords.iter().any(|c| c.near(&coord))
    }

    /// 受け入れた点を作業セットに追加する
    pub fn insert(&mut self, coord: GridCoord) {
        self.coords.insert(coord);
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}
