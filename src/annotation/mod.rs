//! 手書き損傷レイヤー
//!
//! モードごとに専用のラスタを持ち、表示は1モードずつ切り替える。
//!
//! ## 状態遷移
//! - `Idle` → `begin_stroke` → `Stroking`
//! - `Stroking` → `end_stroke` → `Idle`（スナップショット更新・dirty）
//! - `Stroking` 中のリサイズは `end_stroke` まで保留する

pub mod raster;
pub mod snapshot;
pub mod tools;

pub use raster::{Point, Surface};
pub use snapshot::Snapshot;
pub use tools::{BrushSize, Tool, ToolState};

use crate::error::Result;
use damage_intake_common::DamageMode;
use image::{Rgba, RgbaImage};
use raster::PaintOp;
use tracing::debug;

/// 1モード分のレイヤー
#[derive(Debug, Clone)]
pub struct ModeLayer {
    raster: RgbaImage,
    /// 最後に確定した内容（`None` は空）
    snapshot: Option<Snapshot>,
    /// 最後に保存した内容と異なるか
    dirty: bool,
}

impl ModeLayer {
    fn blank(width: u32, height: u32) -> Self {
        Self {
            raster: raster::blank(width, height),
            snapshot: None,
            dirty: false,
        }
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// スナップショットを現在のバッキングサイズで描き直す
    fn redraw(&mut self, width: u32, height: u32) -> Result<()> {
        self.raster = match &self.snapshot {
            Some(snapshot) => raster::redraw_scaled(&snapshot.decode()?, width, height),
            None => raster::blank(width, height),
        };
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StrokeState {
    Idle,
    Stroking { mode: DamageMode, tool: Tool, last: Point },
}

/// 手書きキャンバス（事故損傷・既存損傷の2レイヤー）
#[derive(Debug, Clone)]
pub struct AnnotationCanvas {
    surface: Surface,
    tools: ToolState,
    active_mode: DamageMode,
    incident: ModeLayer,
    preexisting: ModeLayer,
    stroke: StrokeState,
    pending_resize: Option<Surface>,
}

impl AnnotationCanvas {
    pub fn new(surface: Surface, tools: ToolState) -> Self {
        let (w, h) = surface.backing_size();
        Self {
            surface,
            tools,
            active_mode: DamageMode::Incident,
            incident: ModeLayer::blank(w, h),
            preexisting: ModeLayer::blank(w, h),
            stroke: StrokeState::Idle,
            pending_resize: None,
        }
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolState {
        &mut self.tools
    }

    pub fn active_mode(&self) -> DamageMode {
        self.active_mode
    }

    pub fn is_stroking(&self) -> bool {
        matches!(self.stroke, StrokeState::Stroking { .. })
    }

    pub fn layer(&self, mode: DamageMode) -> &ModeLayer {
        match mode {
            DamageMode::Incident => &self.incident,
            DamageMode::Preexisting => &self.preexisting,
        }
    }

    fn layer_mut(&mut self, mode: DamageMode) -> &mut ModeLayer {
        match mode {
            DamageMode::Incident => &mut self.incident,
            DamageMode::Preexisting => &mut self.preexisting,
        }
    }

    /// 表示中のラスタ
    pub fn visible_raster(&self) -> &RgbaImage {
        self.layer(self.active_mode).raster()
    }

    pub fn is_dirty(&self, mode: DamageMode) -> bool {
        self.layer(mode).dirty
    }

    /// 未保存のモード
    pub fn dirty_modes(&self) -> Vec<DamageMode> {
        DamageMode::ALL
            .into_iter()
            .filter(|mode| self.is_dirty(*mode))
            .collect()
    }

    /// 表示モードを切り替える（もう一方のレイヤーは変更しない）
    ///
    /// 描画中なら先にストロークを確定する。
    pub fn set_active_mode(&mut self, mode: DamageMode) -> Result<()> {
        if self.is_stroking() {
            self.end_stroke()?;
        }
        self.active_mode = mode;
        Ok(())
    }

    /// ストローク開始（表示座標）
    ///
    /// ツールが無効なら何もしない。
    ///
    /// # Returns
    /// ストロークを開始したら `true`
    pub fn begin_stroke(&mut self, mode: DamageMode, point: Point) -> Result<bool> {
        if self.is_stroking() {
            self.end_stroke()?;
        }
        let tool = match self.tools.active() {
            Some(tool) => tool,
            None => return Ok(false),
        };
        if mode != self.active_mode {
            self.active_mode = mode;
        }

        let at = self.surface.to_backing(point);
        self.paint(mode, tool, at, at);
        self.stroke = StrokeState::Stroking { mode, tool, last: at };
        Ok(true)
    }

    /// ストローク継続（表示座標）。描画中でなければ無視。
    pub fn continue_stroke(&mut self, point: Point) {
        if let StrokeState::Stroking { mode, tool, last } = self.stroke {
            let at = self.surface.to_backing(point);
            self.paint(mode, tool, last, at);
            self.stroke = StrokeState::Stroking { mode, tool, last: at };
        }
    }

    /// ストローク確定: スナップショットを更新して dirty にする
    ///
    /// 保留中のリサイズがあればここで適用する。
    pub fn end_stroke(&mut self) -> Result<()> {
        let mode = match self.stroke {
            StrokeState::Stroking { mode, .. } => mode,
            StrokeState::Idle => return Ok(()),
        };
        self.stroke = StrokeState::Idle;

        let layer = self.layer_mut(mode);
        layer.snapshot = Some(Snapshot::encode(&layer.raster)?);
        layer.dirty = true;
        debug!(mode = %mode, "stroke committed");

        if let Some(surface) = self.pending_resize.take() {
            self.apply_resize(surface)?;
        }
        Ok(())
    }

    /// 表示サイズ変更
    ///
    /// バッキングストアを作り直し、確定済みの内容を拡縮して描き直す。
    /// 描画中は `end_stroke` まで保留する。
    pub fn resize(&mut self, display_width: f32, display_height: f32) -> Result<()> {
        let surface = Surface::new(display_width, display_height, self.surface.device_pixel_ratio);
        if self.is_stroking() {
            debug!("resize deferred until stroke ends");
            self.pending_resize = Some(surface);
            return Ok(());
        }
        self.pending_resize = None;
        self.apply_resize(surface)
    }

    fn apply_resize(&mut self, surface: Surface) -> Result<()> {
        let previous = self.surface.backing_size();
        self.surface = surface;
        let (w, h) = surface.backing_size();
        if previous == (w, h) {
            return Ok(());
        }
        for mode in DamageMode::ALL {
            self.layer_mut(mode).redraw(w, h)?;
        }
        debug!(width = w, height = h, "backing store reallocated");
        Ok(())
    }

    /// 1モード分を消去（空スナップショット・dirty）
    ///
    /// そのモードで描画中ならストロークを破棄し、保留中のリサイズを適用する。
    pub fn clear_all(&mut self, mode: DamageMode) -> Result<()> {
        if let StrokeState::Stroking { mode: stroking, .. } = self.stroke {
            if stroking == mode {
                self.stroke = StrokeState::Idle;
            }
        }
        let (w, h) = self.surface.backing_size();
        let layer = self.layer_mut(mode);
        layer.raster = raster::blank(w, h);
        layer.snapshot = None;
        layer.dirty = true;

        if !self.is_stroking() {
            if let Some(surface) = self.pending_resize.take() {
                self.apply_resize(surface)?;
            }
        }
        Ok(())
    }

    /// 保存済みの内容で復元（dirty = false）
    pub fn hydrate(&mut self, mode: DamageMode, snapshot: Snapshot) -> Result<()> {
        let (w, h) = self.surface.backing_size();
        let layer = self.layer_mut(mode);
        layer.snapshot = Some(snapshot);
        layer.redraw(w, h)?;
        layer.dirty = false;
        Ok(())
    }

    /// 保存が確認できたモードの dirty を解除
    pub fn mark_persisted(&mut self, mode: DamageMode) {
        self.layer_mut(mode).dirty = false;
    }

    fn paint(&mut self, mode: DamageMode, tool: Tool, from: Point, to: Point) {
        let radius = self.surface.brush_radius(self.tools.width_for(tool));
        let op = match tool {
            Tool::Draw => {
                let [r, g, b] = mode.color();
                PaintOp::Paint(Rgba([r, g, b, 0xff]))
            }
            Tool::Erase => PaintOp::Erase,
        };
        raster::paint_segment(&mut self.layer_mut(mode).raster, from, to, radius, op);
    }
}
