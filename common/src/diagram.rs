//! 車両図面（SVG）モジュール
//!
//! 図面のゾーンコンテナ（`ZONAS`）から選択可能な要素IDを抽出し、
//! 選択状態に応じた塗りを付けたSVGを生成する。
//!
//! 図面の形状そのものは検証しない。

use crate::types::DamageMode;
use regex::{Captures, Regex};
use std::collections::{BTreeSet, HashSet};

/// ゾーンコンテナのID
pub const ZONE_CONTAINER_ID: &str = "ZONAS";

/// コンテナがない場合に除外する構造・レイヤー要素のID接頭辞
const STRUCTURAL_PREFIXES: &[&str] = &["svg", "layer", "capa"];

lazy_static::lazy_static! {
    /// コメントとCDATA（中のタグは要素として扱わない）
    static ref IGNORED_RE: Regex = Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>").unwrap();
    /// 属性値に `>` を含むタグは正しく切り出せない
    static ref TAG_RE: Regex =
        Regex::new(r"<(/?)([A-Za-z_][\w:.\-]*)((?:[^>/]|/[^>])*)(/?)>").unwrap();
    static ref ID_ATTR_RE: Regex =
        Regex::new(r#"(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref FILL_ATTR_RE: Regex =
        Regex::new(r#"\s(?:fill|fill-opacity)\s*=\s*(?:"[^"]*"|'[^']*')"#).unwrap();
    static ref STYLE_ATTR_RE: Regex =
        Regex::new(r#"(\sstyle\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

/// ゾーン要素1つ分の表示状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneHighlight {
    pub id: String,
    /// 選択時はモード色、未選択は `None`（塗りなし）
    pub fill: Option<String>,
}

/// 読み込み済みの車両図面（読み取り専用）
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    markup: String,
    zone_ids: Vec<String>,
    has_zone_container: bool,
}

impl Diagram {
    /// SVGマークアップから図面を構築
    pub fn parse(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let (zone_ids, has_zone_container) = discover_zone_ids(&markup);
        Self {
            markup,
            zone_ids,
            has_zone_container,
        }
    }

    /// 図面の読み込みに失敗した場合の空の図面
    ///
    /// ゾーンIDが空なので `is_valid_zone` は全IDを許可し、ハイライト対象はない。
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// 抽出したゾーンID（出現順・重複なし）
    pub fn zone_ids(&self) -> &[String] {
        &self.zone_ids
    }

    pub fn has_zone_container(&self) -> bool {
        self.has_zone_container
    }

    /// ゾーンIDとして受け付けるか
    ///
    /// 図面からIDを取得できなかった場合はすべて受け付ける。
    pub fn is_valid_zone(&self, zone_id: &str) -> bool {
        self.zone_ids.is_empty() || self.zone_ids.iter().any(|id| id == zone_id)
    }

    /// 各ゾーン要素の表示状態を求める
    pub fn highlight(&self, selected: &BTreeSet<String>, mode: DamageMode) -> Vec<ZoneHighlight> {
        let color = mode.color_hex();
        self.zone_ids
            .iter()
            .map(|id| ZoneHighlight {
                id: id.clone(),
                fill: selected.contains(id).then(|| color.clone()),
            })
            .collect()
    }

    /// 選択ゾーンをモード色で塗ったSVGを生成する
    ///
    /// 選択されていないゾーン要素は透明になる。ゾーン以外の要素は変更しない。
    pub fn render_highlighted_svg(&self, selected: &BTreeSet<String>, mode: DamageMode) -> String {
        if self.zone_ids.is_empty() {
            return self.markup.clone();
        }

        let zones: HashSet<&str> = self.zone_ids.iter().map(String::as_str).collect();
        let color = mode.color_hex();

        map_outside_ignored(&self.markup, |chunk| {
            TAG_RE
                .replace_all(chunk, |caps: &Captures| {
                    let whole = caps[0].to_string();
                    if !caps[1].is_empty() {
                        return whole;
                    }
                    let attrs = &caps[3];
                    let id = match element_id(attrs) {
                        Some(id) if zones.contains(id.as_str()) => id,
                        _ => return whole,
                    };
                    let declarations = if selected.contains(&id) {
                        format!("fill:{};fill-opacity:1", color)
                    } else {
                        "fill:transparent;fill-opacity:0".to_string()
                    };
                    format!(
                        "<{}{}{}>",
                        &caps[2],
                        restyle_attrs(attrs, &declarations),
                        &caps[4]
                    )
                })
                .into_owned()
        })
    }
}

/// コメント・CDATA以外の部分だけを変換する
fn map_outside_ignored<F>(markup: &str, mut transform: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    for m in IGNORED_RE.find_iter(markup) {
        out.push_str(&transform(&markup[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&transform(&markup[last..]));
    out
}

/// マークアップからゾーンIDを抽出する
///
/// `ZONAS` コンテナがあればその子孫要素のID、
/// なければ構造・レイヤー要素を除いた全要素のID。
fn discover_zone_ids(markup: &str) -> (Vec<String>, bool) {
    let cleaned = IGNORED_RE.replace_all(markup, "");

    let mut in_container = Vec::new();
    let mut all_ids = Vec::new();
    let mut found_container = false;
    // (タグ名, コンテナ要素か)
    let mut stack: Vec<(String, bool)> = Vec::new();

    for caps in TAG_RE.captures_iter(&cleaned) {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_string();
        let self_closing = !caps[4].is_empty();

        if closing {
            if let Some(pos) = stack.iter().rposition(|(open, _)| *open == name) {
                stack.truncate(pos);
            }
            continue;
        }

        let id = element_id(&caps[3]);
        let inside = stack.iter().any(|(_, container)| *container);
        let is_container = id
            .as_deref()
            .map_or(false, |id| id.eq_ignore_ascii_case(ZONE_CONTAINER_ID));

        if let Some(id) = id {
            if inside {
                in_container.push(id.clone());
            }
            all_ids.push(id);
        }
        if is_container {
            found_container = true;
        }
        if !self_closing {
            stack.push((name, is_container));
        }
    }

    let ids = if found_container {
        in_container
    } else {
        all_ids
            .into_iter()
            .filter(|id| !is_structural_id(id))
            .collect()
    };

    (dedup_preserving_order(ids), found_container)
}

fn is_structural_id(id: &str) -> bool {
    let lower = id.to_lowercase();
    id == ZONE_CONTAINER_ID || STRUCTURAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn element_id(attrs: &str) -> Option<String> {
    ID_ATTR_RE.captures(attrs).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .filter(|id| !id.is_empty())
    })
}

/// 既存の塗り指定を除き、style に塗りを追記する
fn restyle_attrs(attrs: &str, declarations: &str) -> String {
    let stripped = FILL_ATTR_RE.replace_all(attrs, "").into_owned();

    if STYLE_ATTR_RE.is_match(&stripped) {
        STYLE_ATTR_RE
            .replace(&stripped, |caps: &Captures| {
                let existing = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str().trim().trim_end_matches(';'))
                    .unwrap_or("");
                if existing.is_empty() {
                    format!("{}\"{}\"", &caps[1], declarations)
                } else {
                    format!("{}\"{};{}\"", &caps[1], existing, declarations)
                }
            })
            .into_owned()
    } else {
        format!("{} style=\"{}\"", stripped.trim_end(), declarations)
    }
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
