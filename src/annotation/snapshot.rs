//! 手書きレイヤーのスナップショット（PNG）
//!
//! - PNGバイト列で保持し、そのままアップロードする
//! - `data:image/png;base64,...` 形式との相互変換

use crate::error::{IntakeError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// エンコード済みのラスタ内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    png: Vec<u8>,
}

impl Snapshot {
    /// ラスタをPNGにエンコード
    pub fn encode(image: &RgbaImage) -> Result<Self> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| IntakeError::ImageEncode(e.to_string()))?;
        Ok(Self {
            png: buffer.into_inner(),
        })
    }

    /// PNGバイト列から生成（デコードできることを確認する）
    pub fn from_png(png: Vec<u8>) -> Result<Self> {
        let snapshot = Self { png };
        snapshot.decode()?;
        Ok(snapshot)
    }

    pub fn decode(&self) -> Result<RgbaImage> {
        let image = image::load_from_memory_with_format(&self.png, ImageFormat::Png)
            .map_err(|e| IntakeError::ImageDecode(e.to_string()))?;
        Ok(image.to_rgba8())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }

    pub fn to_data_url(&self) -> String {
        format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(&self.png))
    }

    /// Data URLから生成
    ///
    /// # Arguments
    /// * `data_url` - "data:image/png;base64,iVBORw0..." 形式のData URL
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let encoded = data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| IntakeError::InvalidDataUrl("PNGのData URLではありません".into()))?;
        let png = STANDARD
            .decode(encoded.trim())
            .map_err(|e| IntakeError::InvalidDataUrl(e.to_string()))?;
        Self::from_png(png)
    }
}

/// 明示的に消去されたレイヤー用の 1x1 透明PNG
pub fn transparent_placeholder() -> Result<Snapshot> {
    Snapshot::encode(&RgbaImage::new(1, 1))
}
