//! 手書きツールの状態
//!
//! 描画・消去のどちらか一方だけが有効。セッション全体で共有し、モードごとには持たない。

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Draw,
    Erase,
}

impl std::str::FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draw" | "pen" | "dibujar" => Ok(Tool::Draw),
            "erase" | "eraser" | "borrar" => Ok(Tool::Erase),
            _ => Err(format!("Unknown tool: {}. Use draw or erase", s)),
        }
    }
}

/// ツールごとのブラシ幅（表示ピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushSize {
    pub draw: u32,
    pub erase: u32,
}

impl Default for BrushSize {
    fn default() -> Self {
        Self { draw: 4, erase: 18 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolState {
    active: Option<Tool>,
    pub brush_size: BrushSize,
}

impl ToolState {
    pub fn new(brush_size: BrushSize) -> Self {
        Self {
            active: None,
            brush_size,
        }
    }

    pub fn active(&self) -> Option<Tool> {
        self.active
    }

    /// ツールを有効化（もう一方は無効になる）
    pub fn enable(&mut self, tool: Tool) {
        self.active = Some(tool);
    }

    pub fn disable(&mut self) {
        self.active = None;
    }

    /// 有効なツールを再度選んだ場合は無効化、それ以外は切り替え
    pub fn toggle(&mut self, tool: Tool) {
        if self.active == Some(tool) {
            self.active = None;
        } else {
            self.active = Some(tool);
        }
    }

    pub fn width_for(&self, tool: Tool) -> u32 {
        match tool {
            Tool::Draw => self.brush_size.draw,
            Tool::Erase => self.brush_size.erase,
        }
    }
}
