//! ラスタ操作
//!
//! 線分をブラシ幅のカプセル形状で塗る・消す。
//! アンチエイリアスなし（同じ経路を同じ幅以上で消すと完全に透明へ戻る）。

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// リサイズ時の再描画フィルタ
pub const REDRAW_FILTER: FilterType = FilterType::Triangle;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 表示サイズとデバイスピクセル比
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub display_width: f32,
    pub display_height: f32,
    pub device_pixel_ratio: f32,
}

impl Surface {
    pub fn new(display_width: f32, display_height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            display_width: display_width.max(1.0),
            display_height: display_height.max(1.0),
            device_pixel_ratio: if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 },
        }
    }

    /// バッキングストアのサイズ（表示サイズ × ピクセル比）
    pub fn backing_size(&self) -> (u32, u32) {
        let w = (self.display_width * self.device_pixel_ratio).round().max(1.0) as u32;
        let h = (self.display_height * self.device_pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }

    /// 表示座標をバッキングストア座標へ変換
    pub fn to_backing(&self, point: Point) -> Point {
        let (w, h) = self.backing_size();
        Point {
            x: point.x * (w as f32 / self.display_width),
            y: point.y * (h as f32 / self.display_height),
        }
    }

    /// 表示上のブラシ幅をバッキングストア上の半径へ変換
    pub fn brush_radius(&self, width: u32) -> f32 {
        let (w, _) = self.backing_size();
        width as f32 * (w as f32 / self.display_width) / 2.0
    }
}

/// 塗りの種類
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintOp {
    Paint(Rgba<u8>),
    /// destination-out 相当（透明にする）
    Erase,
}

pub fn blank(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), TRANSPARENT)
}

/// 線分 a-b から半径以内のピクセルを塗る（a == b なら円）
pub fn paint_segment(image: &mut RgbaImage, a: Point, b: Point, radius: f32, op: PaintOp) {
    if radius <= 0.0 || image.width() == 0 || image.height() == 0 {
        return;
    }

    let min_x = (a.x.min(b.x) - radius).floor().max(0.0) as u32;
    let min_y = (a.y.min(b.y) - radius).floor().max(0.0) as u32;
    let max_x = ((a.x.max(b.x) + radius).ceil().max(0.0) as u32).min(image.width() - 1);
    let max_y = ((a.y.max(b.y) + radius).ceil().max(0.0) as u32).min(image.height() - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let pixel = match op {
        PaintOp::Paint(color) => color,
        PaintOp::Erase => TRANSPARENT,
    };
    let radius_sq = radius * radius;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if distance_sq_to_segment(center, a, b) <= radius_sq {
                image.put_pixel(x, y, pixel);
            }
        }
    }
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    (p.x - cx) * (p.x - cx) + (p.y - cy) * (p.y - cy)
}

/// 全ピクセルが透明か
pub fn is_blank(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p.0[3] == 0)
}

/// 不透明ピクセル数
pub fn painted_pixels(image: &RgbaImage) -> usize {
    image.pixels().filter(|p| p.0[3] != 0).count()
}

/// 既存の内容を新しいサイズに拡縮して描き直す
pub fn redraw_scaled(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (width, height) = (width.max(1), height.max(1));
    if source.dimensions() == (width, height) {
        return source.clone();
    }
    imageops::resize(source, width, height, REDRAW_FILTER)
}
