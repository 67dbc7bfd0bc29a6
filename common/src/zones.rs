//! ゾーン選択モデル
//!
//! 事故損傷・既存損傷それぞれの選択ゾーン集合を独立に保持する。
//! 片方のモードの操作がもう片方の集合を変えることはない。

use crate::diagram::{Diagram, ZoneHighlight};
use crate::error::{Error, Result};
use crate::types::DamageMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// モードごとの選択ゾーン
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSelection {
    incident: BTreeSet<String>,
    preexisting: BTreeSet<String>,
}

impl ZoneSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの部品リストから復元する（図面にないIDは除外）
    pub fn from_saved(
        diagram: &Diagram,
        incident: impl IntoIterator<Item = String>,
        preexisting: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut selection = Self::new();
        selection.incident = incident.into_iter().filter(|id| diagram.is_valid_zone(id)).collect();
        selection.preexisting = preexisting
            .into_iter()
            .filter(|id| diagram.is_valid_zone(id))
            .collect();
        selection
    }

    pub fn zones(&self, mode: DamageMode) -> &BTreeSet<String> {
        match mode {
            DamageMode::Incident => &self.incident,
            DamageMode::Preexisting => &self.preexisting,
        }
    }

    fn zones_mut(&mut self, mode: DamageMode) -> &mut BTreeSet<String> {
        match mode {
            DamageMode::Incident => &mut self.incident,
            DamageMode::Preexisting => &mut self.preexisting,
        }
    }

    pub fn is_selected(&self, mode: DamageMode, zone_id: &str) -> bool {
        self.zones(mode).contains(zone_id)
    }

    /// 選択を反転する
    ///
    /// 図面にないIDは `Error::UnknownZone` で拒否し、集合は変わらない。
    ///
    /// # Returns
    /// 反転後に選択状態なら `true`
    pub fn toggle_zone(&mut self, diagram: &Diagram, mode: DamageMode, zone_id: &str) -> Result<bool> {
        if !diagram.is_valid_zone(zone_id) {
            return Err(Error::UnknownZone(zone_id.to_string()));
        }
        let zones = self.zones_mut(mode);
        if zones.remove(zone_id) {
            Ok(false)
        } else {
            zones.insert(zone_id.to_string());
            Ok(true)
        }
    }

    /// 指定ゾーンを選択状態にする（有効なIDのみ）
    ///
    /// # Returns
    /// 新たに追加されたID
    pub fn select_all<'a, I>(&mut self, diagram: &Diagram, mode: DamageMode, zone_ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let zones = self.zones_mut(mode);
        zone_ids
            .into_iter()
            .filter(|id| diagram.is_valid_zone(id))
            .filter(|id| zones.insert(id.to_string()))
            .map(str::to_string)
            .collect()
    }

    /// 1モード分の選択をすべて解除
    pub fn clear(&mut self, mode: DamageMode) {
        self.zones_mut(mode).clear();
    }

    pub fn is_empty(&self, mode: DamageMode) -> bool {
        self.zones(mode).is_empty()
    }

    /// 表示中モードの選択状態で図面のハイライトを求める
    pub fn highlights(&self, diagram: &Diagram, active: DamageMode) -> Vec<ZoneHighlight> {
        diagram.highlight(self.zones(active), active)
    }

    /// 表示中モードの選択状態で塗ったSVG
    pub fn render_svg(&self, diagram: &Diagram, active: DamageMode) -> String {
        diagram.render_highlighted_svg(self.zones(active), active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg><g id="ZONAS"><path id="COFRE"/><path id="TOLDO"/><path id="FACIA_DELANTERA"/></g></svg>"#;

    #[test]
    fn test_toggle_twice_restores_state() {
        let diagram = Diagram::parse(SVG);
        let mut selection = ZoneSelection::new();
        selection.toggle_zone(&diagram, DamageMode::Incident, "TOLDO").unwrap();
        let before = selection.clone();

        assert!(selection.toggle_zone(&diagram, DamageMode::Incident, "COFRE").unwrap());
        assert!(!selection.toggle_zone(&diagram, DamageMode::Incident, "COFRE").unwrap());
        assert_eq!(selection, before);
    }

    #[test]
    fn test_toggle_does_not_touch_other_mode() {
        let diagram = Diagram::parse(SVG);
        let mut selection = ZoneSelection::new();
        selection.toggle_zone(&diagram, DamageMode::Preexisting, "TOLDO").unwrap();
        let other = selection.zones(DamageMode::Preexisting).clone();

        selection.toggle_zone(&diagram, DamageMode::Incident, "TOLDO").unwrap();
        selection.toggle_zone(&diagram, DamageMode::Incident, "COFRE").unwrap();
        assert_eq!(selection.zones(DamageMode::Preexisting), &other);

        selection.clear(DamageMode::Incident);
        assert!(selection.is_empty(DamageMode::Incident));
        assert_eq!(selection.zones(DamageMode::Preexisting), &other);
    }

    #[test]
    fn test_unknown_zone_is_rejected() {
        let diagram = Diagram::parse(SVG);
        let mut selection = ZoneSelection::new();
        let err = selection
            .toggle_zone(&diagram, DamageMode::Incident, "ALERON")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownZone(ref id) if id == "ALERON"));
        assert!(selection.is_empty(DamageMode::Incident));
    }

    #[test]
    fn test_select_all_filters_invalid_and_existing() {
        let diagram = Diagram::parse(SVG);
        let mut selection = ZoneSelection::new();
        selection.toggle_zone(&diagram, DamageMode::Incident, "COFRE").unwrap();
        let added = selection.select_all(&diagram, DamageMode::Incident, ["COFRE", "TOLDO", "ALERON"]);
        assert_eq!(added, vec!["TOLDO".to_string()]);
        assert_eq!(selection.zones(DamageMode::Incident).len(), 2);
    }

    #[test]
    fn test_switching_mode_reevaluates_highlights() {
        let diagram = Diagram::parse(SVG);
        let mut selection = ZoneSelection::new();
        selection.toggle_zone(&diagram, DamageMode::Incident, "COFRE").unwrap();
        selection.toggle_zone(&diagram, DamageMode::Preexisting, "TOLDO").unwrap();
        let snapshot = selection.clone();

        let incident = selection.highlights(&diagram, DamageMode::Incident);
        let filled: Vec<_> = incident.iter().filter(|h| h.fill.is_some()).map(|h| h.id.as_str()).collect();
        assert_eq!(filled, vec!["COFRE"]);

        let preexisting = selection.highlights(&diagram, DamageMode::Preexisting);
        let filled: Vec<_> = preexisting.iter().filter(|h| h.fill.is_some()).collect();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].id, "TOLDO");
        assert_eq!(filled[0].fill.as_deref(), Some("#f2a300"));

        assert_eq!(selection, snapshot);
    }

    #[test]
    fn test_from_saved_drops_unknown_ids() {
        let diagram = Diagram::parse(SVG);
        let selection = ZoneSelection::from_saved(
            &diagram,
            vec!["COFRE".to_string(), "ALERON".to_string()],
            vec!["TOLDO".to_string()],
        );
        assert_eq!(selection.zones(DamageMode::Incident).len(), 1);
        assert!(selection.is_selected(DamageMode::Preexisting, "TOLDO"));
    }
}
