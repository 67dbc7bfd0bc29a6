//! 受付検査の型定義
//!
//! CLIとセッションで共有される型:
//! - DamageMode: 損傷モード（事故損傷 / 既存損傷）
//! - MediaType: メディアサービス上の種別
//! - CatalogEntry / CatalogPart: 部品カタログ

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 照合結果（カタログ部品名の集合）
pub type MatchResult = BTreeSet<String>;

/// 損傷モード
///
/// 1件の受付につき事故損傷と既存損傷の2つだけが存在する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageMode {
    #[serde(rename = "siniestro")]
    Incident,
    #[serde(rename = "preexistente")]
    Preexisting,
}

impl DamageMode {
    pub const ALL: [DamageMode; 2] = [DamageMode::Incident, DamageMode::Preexisting];

    /// ハイライト・描画に使う固定色（RGB）
    pub fn color(&self) -> [u8; 3] {
        match self {
            DamageMode::Incident => [0xe0, 0x4b, 0x4b],
            DamageMode::Preexisting => [0xf2, 0xa3, 0x00],
        }
    }

    /// `#rrggbb` 形式の色
    pub fn color_hex(&self) -> String {
        let [r, g, b] = self.color();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// このモードの手書きレイヤーを保存するメディア種別
    pub fn drawing_media_type(&self) -> MediaType {
        match self {
            DamageMode::Incident => MediaType::DrawingIncident,
            DamageMode::Preexisting => MediaType::DrawingPreexisting,
        }
    }

    /// もう一方のモード
    pub fn other(&self) -> DamageMode {
        match self {
            DamageMode::Incident => DamageMode::Preexisting,
            DamageMode::Preexisting => DamageMode::Incident,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageMode::Incident => "siniestro",
            DamageMode::Preexisting => "preexistente",
        }
    }
}

impl std::fmt::Display for DamageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DamageMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "siniestro" | "incident" | "i" => Ok(DamageMode::Incident),
            "preexistente" | "preexisting" | "pre" | "p" => Ok(DamageMode::Preexisting),
            _ => Err(format!("Unknown mode: {}. Use siniestro or preexistente", s)),
        }
    }
}

/// メディアサービス上の種別
///
/// このクレートが扱うのは手書きレイヤーの2種のみ。
/// 写真・動画・署名などは `Other` としてそのまま保持する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    DrawingIncident,
    DrawingPreexisting,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            MediaType::DrawingIncident => "drawing_damage_siniestro",
            MediaType::DrawingPreexisting => "drawing_damage_preexistente",
            MediaType::Other(s) => s.as_str(),
        }
    }

    /// 手書きレイヤーの種別ならそのモードを返す
    pub fn drawing_mode(&self) -> Option<DamageMode> {
        match self {
            MediaType::DrawingIncident => Some(DamageMode::Incident),
            MediaType::DrawingPreexisting => Some(DamageMode::Preexisting),
            MediaType::Other(_) => None,
        }
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "drawing_damage_siniestro" => MediaType::DrawingIncident,
            "drawing_damage_preexistente" => MediaType::DrawingPreexisting,
            _ => MediaType::Other(value),
        }
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        MediaType::from(value.to_string())
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// カタログ提供元の部品エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    #[serde(alias = "nb_parte")]
    pub name: String,
}

/// 照合対象の部品（名前のみ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPart {
    pub name: String,
}

impl CatalogPart {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&CatalogEntry> for CatalogPart {
    fn from(entry: &CatalogEntry) -> Self {
        Self { name: entry.name.clone() }
    }
}

impl From<&str> for CatalogPart {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_colors_are_distinct() {
        assert_eq!(DamageMode::Incident.color_hex(), "#e04b4b");
        assert_eq!(DamageMode::Preexisting.color_hex(), "#f2a300");
        assert_ne!(DamageMode::Incident.color(), DamageMode::Preexisting.color());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("siniestro".parse::<DamageMode>().unwrap(), DamageMode::Incident);
        assert_eq!("PRE".parse::<DamageMode>().unwrap(), DamageMode::Preexisting);
        assert!("otro".parse::<DamageMode>().is_err());
    }

    #[test]
    fn test_media_type_roundtrip_through_json() {
        let json = serde_json::to_string(&MediaType::DrawingPreexisting).unwrap();
        assert_eq!(json, "\"drawing_damage_preexistente\"");
        let parsed: MediaType = serde_json::from_str("\"signature\"").unwrap();
        assert_eq!(parsed, MediaType::Other("signature".to_string()));
        assert_eq!(parsed.drawing_mode(), None);
    }

    #[test]
    fn test_drawing_media_type_per_mode() {
        assert_eq!(
            DamageMode::Incident.drawing_media_type().drawing_mode(),
            Some(DamageMode::Incident)
        );
        assert_eq!(
            DamageMode::Preexisting.drawing_media_type().as_str(),
            "drawing_damage_preexistente"
        );
    }

    #[test]
    fn test_catalog_entry_accepts_legacy_field() {
        let entry: CatalogEntry = serde_json::from_str(r#"{"id": 3, "nb_parte": "COFRE"}"#).unwrap();
        assert_eq!(entry.name, "COFRE");
    }
}
