//! 受付検査の編集セッション
//!
//! カタログ・図面を共有（読み取り専用）し、ゾーン選択と手書きレイヤーを
//! 1レコード分まとめて保持する。説明文とカタログが揃った時点で、
//! 事故損傷ゾーンを照合結果から1回だけ自動選択する。

use crate::annotation::AnnotationCanvas;
use crate::error::{IntakeError, Result};
use crate::persistence::{self, SaveReport};
use crate::services::{
    CatalogPartsProvider, DiagramResource, MediaUploadService, RecordId, RecordMediaList,
};
use damage_intake_common::{
    normalize_part_id, CatalogEntry, CatalogIndex, CatalogPart, DamageMode, Diagram, MatchResult,
    ZoneHighlight, ZoneSelection,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 自動選択の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoSeed {
    Pending,
    Done,
}

#[derive(Debug)]
pub struct InspectionSession {
    record_id: Option<RecordId>,
    catalog: Arc<CatalogIndex>,
    diagram: Arc<Diagram>,
    zones: ZoneSelection,
    canvas: AnnotationCanvas,
    auto_seed: AutoSeed,
    description: Option<String>,
}

impl InspectionSession {
    /// 新規セッション（レコード未保存なら `record_id` は `None`）
    pub fn open(
        record_id: Option<RecordId>,
        catalog: Arc<CatalogIndex>,
        diagram: Arc<Diagram>,
        canvas: AnnotationCanvas,
    ) -> Self {
        Self {
            record_id,
            catalog,
            diagram,
            zones: ZoneSelection::new(),
            canvas,
            auto_seed: AutoSeed::Pending,
            description: None,
        }
    }

    /// 既存レコードのセッション
    ///
    /// 保存済みのゾーン選択と手書きレイヤーを復元する。
    pub async fn open_existing(
        record_id: RecordId,
        catalog: Arc<CatalogIndex>,
        diagram: Arc<Diagram>,
        canvas: AnnotationCanvas,
        zones: ZoneSelection,
        media: &dyn RecordMediaList,
    ) -> Result<Self> {
        let mut session = Self::open(Some(record_id), catalog, diagram, canvas);
        session.zones = zones;
        let hydrated = persistence::hydrate_drawings(&mut session.canvas, record_id, media).await?;
        info!(record_id, layers = hydrated.len(), "session hydrated");
        Ok(session)
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    /// レコード作成後にIDを設定する
    pub fn assign_record_id(&mut self, record_id: RecordId) {
        self.record_id = Some(record_id);
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn zones(&self) -> &ZoneSelection {
        &self.zones
    }

    pub fn canvas(&self) -> &AnnotationCanvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut AnnotationCanvas {
        &mut self.canvas
    }

    pub fn auto_seed(&self) -> AutoSeed {
        self.auto_seed
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 説明文（手入力またはOCR）を受け取る
    ///
    /// # Returns
    /// 自動選択で追加されたゾーンID
    pub fn provide_description(&mut self, text: &str) -> Vec<String> {
        self.description = Some(text.to_string());
        self.try_auto_seed()
    }

    /// カタログを差し替える（遅れて読み込まれた場合など）
    ///
    /// # Returns
    /// 自動選択で追加されたゾーンID
    pub fn provide_catalog(&mut self, catalog: Arc<CatalogIndex>) -> Vec<String> {
        self.catalog = catalog;
        self.try_auto_seed()
    }

    /// 現在の説明文をカタログと照合する
    pub fn matched_parts(&self) -> MatchResult {
        match &self.description {
            Some(text) => self.catalog.match_description(text),
            None => MatchResult::new(),
        }
    }

    fn try_auto_seed(&mut self) -> Vec<String> {
        if self.auto_seed == AutoSeed::Done {
            return Vec::new();
        }
        let has_description = self
            .description
            .as_deref()
            .map_or(false, |text| !text.trim().is_empty());
        if !has_description || self.catalog.is_empty() {
            return Vec::new();
        }

        self.auto_seed = AutoSeed::Done;
        if !self.zones.is_empty(DamageMode::Incident) {
            debug!("incident zones already set; auto-seed skipped");
            return Vec::new();
        }

        let zone_ids: Vec<String> = self
            .matched_parts()
            .iter()
            .map(|name| normalize_part_id(name))
            .collect();
        let added = self.zones.select_all(
            &self.diagram,
            DamageMode::Incident,
            zone_ids.iter().map(String::as_str),
        );
        info!(matched = zone_ids.len(), selected = added.len(), "incident zones auto-seeded");
        added
    }

    /// ゾーンのクリック
    ///
    /// # Returns
    /// クリック後に選択状態なら `true`
    pub fn toggle_zone(&mut self, mode: DamageMode, zone_id: &str) -> Result<bool> {
        Ok(self.zones.toggle_zone(&self.diagram, mode, zone_id)?)
    }

    pub fn clear_zones(&mut self, mode: DamageMode) {
        self.zones.clear(mode);
    }

    /// 表示モード切り替え（ゾーン表示と手書きレイヤーの両方）
    pub fn set_active_mode(&mut self, mode: DamageMode) -> Result<()> {
        self.canvas.set_active_mode(mode)
    }

    pub fn active_mode(&self) -> DamageMode {
        self.canvas.active_mode()
    }

    pub fn highlights(&self) -> Vec<ZoneHighlight> {
        self.zones.highlights(&self.diagram, self.active_mode())
    }

    pub fn render_svg(&self) -> String {
        self.zones.render_svg(&self.diagram, self.active_mode())
    }

    /// オペレーターが追加した部品をカタログに登録し、照合対象に加える
    pub async fn register_part(
        &mut self,
        provider: &dyn CatalogPartsProvider,
        name: &str,
    ) -> Result<CatalogEntry> {
        let entry = provider.create(name).await?;
        let mut parts: Vec<CatalogPart> = self
            .catalog
            .parts()
            .iter()
            .map(|p| CatalogPart::new(p.name.clone()))
            .collect();
        if !parts.iter().any(|p| p.name == entry.name) {
            parts.push(CatalogPart::from(&entry));
        }
        self.catalog = Arc::new(CatalogIndex::build(&parts));
        Ok(entry)
    }

    /// 未保存の手書きレイヤーを保存する
    pub async fn save(&mut self, uploader: &dyn MediaUploadService) -> Result<SaveReport> {
        let record_id = self
            .record_id
            .ok_or_else(|| IntakeError::InvalidArgument("レコードIDが未設定です".into()))?;
        persistence::save_drawings(&mut self.canvas, record_id, uploader).await
    }
}

/// カタログを読み込んでインデックスを作る
///
/// 読み込みに失敗した場合は警告を出して空のインデックスを返す（照合結果は空になる）。
pub async fn load_catalog_index(provider: &dyn CatalogPartsProvider) -> CatalogIndex {
    match provider.list().await {
        Ok(entries) => {
            let parts: Vec<CatalogPart> = entries.iter().map(CatalogPart::from).collect();
            let index = CatalogIndex::build(&parts);
            debug!(entries = entries.len(), indexed = index.len(), "catalog loaded");
            index
        }
        Err(e) => {
            warn!(error = %e, "catalog unavailable");
            CatalogIndex::default()
        }
    }
}

/// 図面を読み込む
///
/// 読み込みに失敗した場合は警告を出して空の図面を返す（全IDを許可、ハイライトなし）。
pub async fn load_diagram(resource: &dyn DiagramResource) -> Diagram {
    match resource.load().await {
        Ok(markup) => {
            let diagram = Diagram::parse(markup);
            debug!(zones = diagram.zone_ids().len(), "diagram loaded");
            diagram
        }
        Err(e) => {
            warn!(error = %e, "diagram unavailable; zone ids will not be validated");
            Diagram::unavailable()
        }
    }
}
