//! Pixel-level compositing helpers.

use image::{Rgba, RgbaImage};

/// Blends `color` over the pixel at (`x`, `y`) with the given coverage.
///
/// Coordinates outside the canvas are ignored. The destination keeps its
/// alpha; frames are opaque.
#[inline]
pub fn blend(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0) * (color.0[3] as f32 / 255.0);
    if alpha <= 0.0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let mixed = color.0[c] as f32 * alpha + dst.0[c] as f32 * (1.0 - alpha);
        dst.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Fills `rect` with `color`, rounding its corners by `radius` pixels.
pub fn fill_rounded_rect(canvas: &mut RgbaImage, rect: Rect, radius: u32, color: Rgba<u8>) {
    let radius = radius.min(rect.width / 2).min(rect.height / 2) as f32;
    let (left, top) = (rect.x as f32, rect.y as f32);
    let (right, bottom) = (rect.right() as f32, rect.bottom() as f32);

    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            // Distance from the pixel centre to the nearest corner centre.
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let cx = px.clamp(left + radius, right - radius);
            let cy = py.clamp(top + radius, bottom - radius);
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            let coverage = (radius - d + 0.5).clamp(0.0, 1.0);
            let coverage = if radius == 0.0 { 1.0 } else { coverage };
            blend(canvas, x, y, color, coverage);
        }
    }
}
