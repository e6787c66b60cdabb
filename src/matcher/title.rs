//! タイトル照合
//!
//! 新規候補のタイトルがカタログ内の既存アニメと一致するかを判定する。
//! 一致クラスは優先順位付きで、上位クラスにヒットがあれば下位は見ない：
//! 1. 完全一致（正規化前の文字列が name / name_cn と等しい）
//! 2. 正規化一致（記号・空白除去＋小文字化後に等しい）
//! 3. ファジー一致（前方一致・部分一致。短いタイトルの誤爆を避けるため
//!    正規化後5文字以上のみ対象）
//!
//! スコア定数は経験的に調整された値であり、再導出せずそのまま使う。

use crate::catalog::Catalog;

/// ファジー一致に参加できる正規化後の最小文字数
pub const FUZZY_MIN_LEN: usize = 5;
/// 前方一致の基準スコア
pub const PREFIX_BASE_SCORE: f64 = 95.0;
/// 前方一致で長さ差1文字あたりに引く減点
pub const PREFIX_LEN_PENALTY: f64 = 0.1;
/// 「既存タイトルが候補を含む」一致の重み
pub const CONTAINS_WEIGHT: f64 = 80.0;
/// 「候補が既存タイトルを含む」一致の重み
pub const CONTAINED_WEIGHT: f64 = 70.0;

/// 一致の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// 完全一致（スコア100）
    Exact,
    /// 正規化後の完全一致（スコア90）
    Normalized,
    /// 既存タイトルが候補で始まる
    Prefix,
    /// 既存タイトルが候補を含む（前方一致を除く）
    Contains,
    /// 候補が既存タイトルを含む
    Contained,
}

/// タイトル照合の結果。永続化しない一時オブジェクト
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub local_id: u32,
    /// 一致したエントリの日本語タイトル
    pub name: String,
    /// 一致したエントリの中文タイトル
    pub name_cn: String,
    /// 0〜100。クラス内の比較にのみ使う
    pub score: f64,
    pub kind: MatchKind,
}

/// タイトルを比較用に正規化する
///
/// Unicodeの文字・数字だけを残して小文字化する。記号・空白・
/// 約物はすべて落とす（日中英いずれのタイトルにも同じ規則を適用）。
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// 候補タイトルをカタログ全体と照合する
///
/// カタログ全体を走査し、最上位クラスのうち最良の一致を返す。
/// 同点はローカルID昇順の走査順で先のものが勝つため、
/// 同じスナップショットに対する結果は決定的。
pub fn match_title(catalog: &Catalog, title: &str) -> Option<MatchCandidate> {
    let normalized = normalize_title(title);
    let cand_len = normalized.chars().count();

    let mut exact: Option<MatchCandidate> = None;
    let mut norm_exact: Option<MatchCandidate> = None;
    let mut fuzzy: Option<MatchCandidate> = None;

    for (local_id, entry) in catalog.iter() {
        let make = |score: f64, kind: MatchKind| MatchCandidate {
            local_id,
            name: entry.name.clone(),
            name_cn: entry.name_cn.clone(),
            score,
            kind,
        };

        // 完全一致（正規化前、バイト単位で等しいこと）
        if (!entry.name.is_empty() && entry.name == title)
            || (!entry.name_cn.is_empty() && entry.name_cn == title)
        {
            if exact.is_none() {
                exact = Some(make(100.0, MatchKind::Exact));
            }
            continue;
        }

        let norm_name = normalize_title(&entry.name);
        let norm_name_cn = normalize_title(&entry.name_cn);

        // 正規化一致。空文字列になったタイトルは何とも一致しない
        if (!normalized.is_empty() && normalized == norm_name)
            || (!normalized.is_empty() && normalized == norm_name_cn)
        {
            if norm_exact.is_none() {
                norm_exact = Some(make(90.0, MatchKind::Normalized));
            }
            continue;
        }

        // ファジー一致。name / name_cn を独立に採点して高い方を採用
        if cand_len >= FUZZY_MIN_LEN {
            for entry_title in [&norm_name, &norm_name_cn] {
                if let Some((score, kind)) = fuzzy_score(&normalized, cand_len, entry_title) {
                    let better = fuzzy.as_ref().map_or(true, |best| score > best.score);
                    if better {
                        fuzzy = Some(make(score, kind));
                    }
                }
            }
        }
    }

    // クラス優先順位：完全一致 → 正規化一致 → ファジー
    exact.or(norm_exact).or(fuzzy)
}

/// 正規化済みタイトル同士のファジースコア
///
/// 前方一致 > 包含 > 逆包含 の順で強い一致とみなす重み付け。
fn fuzzy_score(cand: &str, cand_len: usize, entry_title: &str) -> Option<(f64, MatchKind)> {
    if entry_title.is_empty() {
        return None;
    }
    let entry_len = entry_title.chars().count();
    let mut best: Option<(f64, MatchKind)> = None;

    let mut consider = |score: f64, kind: MatchKind| {
        if score > 0.0 && best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, kind));
        }
    };

    if entry_title.starts_with(cand) {
        let score = PREFIX_BASE_SCORE - (entry_len - cand_len) as f64 * PREFIX_LEN_PENALTY;
        consider(score, MatchKind::Prefix);
    } else if entry_len >= FUZZY_MIN_LEN && entry_title.contains(cand) {
        let score = cand_len as f64 / entry_len as f64 * CONTAINS_WEIGHT;
        consider(score, MatchKind::Contains);
    }

    if entry_len >= FUZZY_MIN_LEN && cand.contains(entry_title) {
        let score = entry_len as f64 / cand_len as f64 * CONTAINED_WEIGHT;
        consider(score, MatchKind::Contained);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;

    fn catalog_with(entries: &[(u32, &str, &str)]) -> Catalog {
        let mut catalog = Catalog::new();
        for (id, name, name_cn) in entries {
            catalog.insert(
                *id,
                CatalogEntry {
                    name: name.to_string(),
                    name_cn: name_cn.to_string(),
                    cover: String::new(),
                    theme_color: String::new(),
                    points: Vec::new(),
                    region: Vec::new(),
                },
            );
        }
        catalog
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Sample Anime 2: The Sequel"), "sampleanime2thesequel");
        assert_eq!(normalize_title("進撃の巨人"), "進撃の巨人");
        assert_eq!(normalize_title("ぼっち・ざ・ろっく！"), "ぼっちざろっく");
        assert_eq!(normalize_title("!?？…"), "");
    }

    #[test]
    fn test_exact_match_wins() {
        let catalog = catalog_with(&[(12, "進撃の巨人", "")]);
        let result = match_title(&catalog, "進撃の巨人").expect("一致するはず");
        assert_eq!(result.local_id, 12);
        assert_eq!(result.kind, MatchKind::Exact);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn test_exact_match_on_localized_title() {
        let catalog = catalog_with(&[(3, "進撃の巨人", "进击的巨人")]);
        let result = match_title(&catalog, "进击的巨人").expect("中文名で一致するはず");
        assert_eq!(result.local_id, 3);
        assert_eq!(result.kind, MatchKind::Exact);
    }

    #[test]
    fn test_normalized_match() {
        let catalog = catalog_with(&[(7, "ぼっち・ざ・ろっく！", "")]);
        let result = match_title(&catalog, "ぼっち ざ ろっく").expect("正規化一致するはず");
        assert_eq!(result.local_id, 7);
        assert_eq!(result.kind, MatchKind::Normalized);
        assert_eq!(result.score, 90.0);
    }

    #[test]
    fn test_prefix_match_beats_new_entry() {
        let catalog = catalog_with(&[(5, "Sample Anime 2: The Sequel", "")]);
        let result = match_title(&catalog, "Sample Anime 2").expect("前方一致するはず");
        assert_eq!(result.local_id, 5);
        assert_eq!(result.kind, MatchKind::Prefix);
        // "sampleanime2" (12文字) と "sampleanime2thesequel" (21文字) の差は9文字
        let expected = PREFIX_BASE_SCORE - 9.0 * PREFIX_LEN_PENALTY;
        assert!((result.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_contains_match() {
        let catalog = catalog_with(&[(8, "劇場版 ヴァイオレット・エヴァーガーデン", "")]);
        let result = match_title(&catalog, "ヴァイオレットエヴァーガーデン").expect("包含一致するはず");
        assert_eq!(result.local_id, 8);
        assert_eq!(result.kind, MatchKind::Contains);
        assert!(result.score > 0.0 && result.score <= CONTAINS_WEIGHT);
    }

    #[test]
    fn test_contained_match() {
        let catalog = catalog_with(&[(9, "氷菓", "")]);
        // 既存タイトルが2文字しかないので逆包含もファジー対象外
        assert!(match_title(&catalog, "氷菓 完全版スペシャル").is_none());

        let catalog = catalog_with(&[(9, "リコリス・リコイル", "")]);
        let result = match_title(&catalog, "リコリス・リコイル 特別編").expect("逆包含一致するはず");
        assert_eq!(result.kind, MatchKind::Contained);
    }

    #[test]
    fn test_short_titles_never_fuzzy_match() {
        let catalog = catalog_with(&[(1, "けいおん！！ 劇場版", "")]);
        // 正規化後4文字しかない候補はファジー一致に参加しない
        assert!(match_title(&catalog, "けいおん").is_none());

        // 5文字に達すれば前方一致できる
        let catalog = catalog_with(&[(1, "ゆるキャン△ SEASON2", "")]);
        let result = match_title(&catalog, "ゆるキャン").expect("5文字なら一致するはず");
        assert_eq!(result.kind, MatchKind::Prefix);
    }

    #[test]
    fn test_no_match_returns_none() {
        let catalog = catalog_with(&[(1, "君の名は。", "你的名字。")]);
        assert!(match_title(&catalog, "天気の子").is_none());
    }

    #[test]
    fn test_empty_normalized_title_never_matches() {
        let catalog = catalog_with(&[(1, "", "")]);
        assert!(match_title(&catalog, "！？").is_none());
    }

    #[test]
    fn test_matching_is_deterministic() {
        let catalog = catalog_with(&[
            (2, "Sample Anime 2: The Sequel", ""),
            (10, "Sample Anime 2: The Movie", ""),
        ]);
        let first = match_title(&catalog, "Sample Anime 2").unwrap();
        let second = match_title(&catalog, "Sample Anime 2").unwrap();
        assert_eq!(first.local_id, second.local_id);
        assert_eq!(first.score, second.score);
        // 同点なら走査順（ID昇順）で先のものが勝つ
        // "The Movie"(8文字差) の方が "The Sequel"(9文字差) よりスコアが高い
        assert_eq!(first.local_id, 10);
    }

    #[test]
    fn test_best_fuzzy_across_catalog() {
        let catalog = catalog_with(&[
            (1, "やはり俺の青春ラブコメはまちがっている。続", ""),
            (2, "やはり俺の青春ラブコメはまちがっている。", ""),
        ]);
        let result = match_title(&catalog, "やはり俺の青春ラブコメはまちがっている").unwrap();
        // 長さ差が小さい ID 2 の方が高スコア
        assert_eq!(result.local_id, 2);
        assert_eq!(result.kind, MatchKind::Prefix);
    }
}
