//! Placement of overlay text.
//!
//! Font sizes, padding and margins are fractions of the frame height so
//! the overlay looks the same at every output resolution.

use super::draw::Rect;
use super::font::TextSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Frame corner a text block is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopRight,
    BottomLeft,
}

/// Tunable overlay appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Fonts tried before the system defaults.
    pub font_candidates: Vec<PathBuf>,
    /// Date label size as a fraction of frame height.
    pub label_scale: f32,
    /// Place name size as a fraction of frame height.
    pub place_scale: f32,
    /// Opacity of the backing box, 0 to 1.
    pub box_alpha: f32,
    /// Padding around text as a fraction of its font size.
    pub padding: f32,
    /// Distance from the frame edge as a fraction of frame height.
    pub margin: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_candidates: Vec::new(),
            label_scale: 0.05,
            place_scale: 0.03,
            box_alpha: 0.5,
            padding: 0.3,
            margin: 0.02,
        }
    }
}

/// Where one text block goes on a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Font size in pixels.
    pub px: f32,
    /// Backing box; `None` for empty text.
    pub backing: Option<Rect>,
    /// Top-left corner of the text itself.
    pub origin: (i32, i32),
}

impl OverlayStyle {
    /// Font size in pixels for a scale on a frame of `frame_height`.
    pub fn font_px(&self, scale: f32, frame_height: u32) -> f32 {
        (scale * frame_height as f32).max(6.0)
    }

    /// Places text of measured `size` at `anchor` on a `frame` sized canvas.
    pub fn place(&self, anchor: Anchor, size: TextSize, px: f32, frame: (u32, u32)) -> TextPlacement {
        let (frame_w, frame_h) = frame;
        let pad = (px * self.padding).round().max(1.0) as i32;
        let margin = (frame_h as f32 * self.margin).round().max(1.0) as i32;

        let box_w = size.width as i32 + 2 * pad;
        let box_h = size.height as i32 + 2 * pad;

        let (box_x, box_y) = match anchor {
            Anchor::TopRight => (frame_w as i32 - margin - box_w, margin),
            Anchor::BottomLeft => (margin, frame_h as i32 - margin - box_h),
        };

        let backing = (size.width > 0).then(|| Rect {
            x: box_x,
            y: box_y,
            width: box_w as u32,
            height: box_h as u32,
        });

        TextPlacement {
            px,
            backing,
            origin: (box_x + pad, box_y + pad),
        }
    }

    /// Corner radius of a backing box.
    pub fn corner_radius(&self, rect: &Rect) -> u32 {
        rect.height / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: (u32, u32) = (768, 400);

    #[test]
    fn test_font_sizes_follow_frame_height() {
        let style = OverlayStyle::default();
        assert!((style.font_px(style.label_scale, 400) - 20.0).abs() < 1e-4);
        assert!((style.font_px(style.place_scale, 1000) - 30.0).abs() < 1e-4);
        assert_eq!(style.font_px(style.place_scale, 10), 6.0);
    }

    #[test]
    fn test_top_right_anchor() {
        let style = OverlayStyle::default();
        let size = TextSize {
            width: 80,
            height: 20,
        };
        let placement = style.place(Anchor::TopRight, size, 20.0, FRAME);
        let rect = placement.backing.unwrap();

        assert_eq!(rect.right(), 768 - 8);
        assert_eq!(rect.y, 8);
        assert_eq!(rect.width, 80 + 12);
        assert_eq!(placement.origin, (rect.x + 6, rect.y + 6));
    }

    #[test]
    fn test_bottom_left_anchor() {
        let style = OverlayStyle::default();
        let size = TextSize {
            width: 100,
            height: 12,
        };
        let placement = style.place(Anchor::BottomLeft, size, 12.0, FRAME);
        let rect = placement.backing.unwrap();

        assert_eq!(rect.x, 8);
        assert_eq!(rect.bottom(), 400 - 8);
    }

    #[test]
    fn test_empty_text_has_no_backing() {
        let style = OverlayStyle::default();
        let size = TextSize {
            width: 0,
            height: 20,
        };
        assert!(style.place(Anchor::TopRight, size, 20.0, FRAME).backing.is_none());
    }
}
