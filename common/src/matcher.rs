//! カタログ照合モジュール
//!
//! 損傷説明（手入力またはOCR抽出）を区切り文字でセグメントに分け、
//! セグメントごとに最も一致するカタログ部品を選ぶ。
//!
//! ## スコア
//! - 正規化名の包含（どちら向きでも）: 10（その時点で確定、以降の部品は見ない）
//! - それ以外: `hits / 部品トークン数 + hits * 0.2`
//! - 最高スコアが 0.6 以上なら採用
//!
//! 同点・包含の判定はカタログ順に依存する（先勝ち）。

use crate::text::{normalize, tokenize};
use crate::types::{CatalogPart, MatchResult};
use std::collections::BTreeSet;

/// 包含一致のスコア
pub const CONTAINMENT_SCORE: f64 = 10.0;
/// 一致トークン数あたりの加点
pub const HIT_WEIGHT: f64 = 0.2;
/// 採用閾値
pub const ACCEPT_THRESHOLD: f64 = 0.6;

const SEGMENT_SEPARATORS: &[char] = &[',', '\n', ';', '/'];

/// 照合用に前処理した部品
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPart {
    pub name: String,
    pub normalized_name: String,
    pub tokens: BTreeSet<String>,
}

/// カタログの照合インデックス
///
/// トークンを持たない部品は照合対象から除外される（元のカタログには残る）。
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    parts: Vec<IndexedPart>,
}

impl CatalogIndex {
    /// カタログからインデックスを構築（カタログ順を保持）
    pub fn build<'a, I>(catalog: I) -> Self
    where
        I: IntoIterator<Item = &'a CatalogPart>,
    {
        let parts = catalog
            .into_iter()
            .filter_map(|part| {
                let tokens = tokenize(&part.name);
                if tokens.is_empty() {
                    return None;
                }
                Some(IndexedPart {
                    name: part.name.clone(),
                    normalized_name: normalize(&part.name),
                    tokens,
                })
            })
            .collect();

        Self { parts }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[IndexedPart] {
        &self.parts
    }

    /// 説明文をカタログ部品名の集合に変換する
    pub fn match_description(&self, description: &str) -> MatchResult {
        let mut result = MatchResult::new();

        if description.trim().is_empty() || self.parts.is_empty() {
            return result;
        }

        for segment in description.split(SEGMENT_SEPARATORS) {
            if let Some(part) = self.best_for_segment(segment.trim()) {
                result.insert(part.name.clone());
            }
        }

        result
    }

    /// 1セグメント分の最良部品（閾値未満なら `None`）
    fn best_for_segment(&self, segment: &str) -> Option<&IndexedPart> {
        let segment_normalized = normalize(segment);
        let segment_tokens = tokenize(segment);
        if segment_tokens.is_empty() {
            return None;
        }

        let mut best: Option<(&IndexedPart, f64)> = None;

        for part in &self.parts {
            if segment_normalized.contains(&part.normalized_name)
                || part.normalized_name.contains(&segment_normalized)
            {
                best = Some((part, CONTAINMENT_SCORE));
                break;
            }

            let score = token_score(&segment_tokens, &part.tokens);
            if score <= 0.0 {
                continue;
            }
            // 同点は先に見た部品を残す
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((part, score));
            }
        }

        best.filter(|(_, score)| *score >= ACCEPT_THRESHOLD)
            .map(|(part, _)| part)
    }
}

/// トークン一致スコア
///
/// 部品トークンの被覆率に一致数のボーナスを足す。
/// 一致がなければ 0。
pub fn token_score(segment_tokens: &BTreeSet<String>, part_tokens: &BTreeSet<String>) -> f64 {
    if part_tokens.is_empty() {
        return 0.0;
    }
    let hits = segment_tokens.intersection(part_tokens).count();
    if hits == 0 {
        return 0.0;
    }
    hits as f64 / part_tokens.len() as f64 + hits as f64 * HIT_WEIGHT
}

/// 説明文をカタログ部品名の集合に変換する
///
/// 単発の呼び出し用。繰り返し照合する場合は [`CatalogIndex`] を使い回す。
///
/// # Arguments
/// * `description` - 損傷説明（OCR抽出または手入力）
/// * `catalog` - 部品カタログ
///
/// # Examples
/// ```
/// use damage_intake_common::{match_parts, CatalogPart};
///
/// let catalog: Vec<CatalogPart> = ["FACIA DELANTERA", "FARO DERECHO", "COFRE"]
///     .into_iter()
///     .map(CatalogPart::from)
///     .collect();
/// let result = match_parts("FACIA DELANTERA dañada, checar FARO DERECHO", &catalog);
/// assert_eq!(result.len(), 2);
/// assert!(result.contains("FARO DERECHO"));
/// ```
pub fn match_parts(description: &str, catalog: &[CatalogPart]) -> MatchResult {
    if description.trim().is_empty() || catalog.is_empty() {
        return MatchResult::new();
    }
    CatalogIndex::build(catalog).match_description(description)
}
