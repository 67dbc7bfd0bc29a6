use crate::annotation::{AnnotationCanvas, BrushSize, Surface, ToolState};
use crate::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MEDIA_ROOT_ENV: &str = "DAMAGE_INTAKE_MEDIA_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// メディア保存先（ローカルのメディアストア）
    pub media_root: PathBuf,
    /// 部品カタログJSON
    pub catalog_path: Option<PathBuf>,
    /// 車両図面SVG
    pub diagram_path: Option<PathBuf>,
    /// 手書きキャンバスの表示サイズ（CSSピクセル）
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub device_pixel_ratio: f32,
    pub draw_brush_size: u32,
    pub erase_brush_size: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default_config()
        };

        // 環境変数を優先
        if let Ok(root) = std::env::var(MEDIA_ROOT_ENV) {
            config.media_root = PathBuf::from(root);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| IntakeError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("damage-intake").join("config.json"))
    }

    fn default_config() -> Self {
        let media_root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("damage-intake")
            .join("media");

        Self {
            media_root,
            catalog_path: None,
            diagram_path: None,
            canvas_width: 640,
            canvas_height: 360,
            device_pixel_ratio: 1.0,
            draw_brush_size: 4,
            erase_brush_size: 18,
            log_level: "info".into(),
        }
    }

    pub fn surface(&self) -> Surface {
        Surface::new(
            self.canvas_width as f32,
            self.canvas_height as f32,
            self.device_pixel_ratio,
        )
    }

    pub fn brush_size(&self) -> BrushSize {
        BrushSize {
            draw: self.draw_brush_size,
            erase: self.erase_brush_size,
        }
    }

    /// 設定のサイズ・ブラシで空のキャンバスを作る
    pub fn new_canvas(&self) -> AnnotationCanvas {
        AnnotationCanvas::new(self.surface(), ToolState::new(self.brush_size()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(IntakeError::Config("キャンバスサイズは1以上にしてください".into()));
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(IntakeError::Config(format!(
                "device_pixel_ratio が不正です: {}",
                self.device_pixel_ratio
            )));
        }
        if self.draw_brush_size == 0 || self.erase_brush_size == 0 {
            return Err(IntakeError::Config("ブラシサイズは1以上にしてください".into()));
        }
        Ok(())
    }
}
