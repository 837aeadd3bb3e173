//! Overlay compositor.
//!
//! Decodes the rendered animation, draws the period label in the top-right
//! corner and the place name in the bottom-left corner of every frame, and
//! writes the result back over the original file. Frame order, offsets and
//! delays pass through untouched.
//!
//! The rewrite is atomic: if any frame fails, the un-annotated animation
//! on disk is left exactly as it was.

mod draw;
mod font;
mod layout;

pub use draw::{blend, fill_rounded_rect, Rect};
pub use font::{FontProvider, FontSource, LoadedFont, TextSize};
pub use layout::{Anchor, OverlayStyle, TextPlacement};

use crate::render::{read_animation, write_animation, AnimationError};
use image::{Frame, Rgba, RgbaImage};
use std::path::Path;
use thiserror::Error;

const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Errors that can occur while annotating an animation.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error(transparent)]
    Animation(#[from] AnimationError),
    #[error("animation has no frames")]
    NoFrames,
    #[error("failed to draw frame {frame}: {message}")]
    Draw { frame: usize, message: String },
}

/// Result of a successful annotation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySummary {
    pub frames: usize,
    pub font: String,
}

/// Annotates a rendered animation in place.
pub trait FrameAnnotator {
    /// Draws `labels[i]` and `place` onto frame `i` of the animation at
    /// `path`. On error the file is left as it was.
    fn annotate(
        &self,
        path: &Path,
        labels: &[String],
        place: &str,
    ) -> Result<OverlaySummary, OverlayError>;
}

/// Draws date and place text onto rendered frames.
#[derive(Debug)]
pub struct OverlayCompositor {
    style: OverlayStyle,
    font: LoadedFont,
}

impl OverlayCompositor {
    /// Creates a compositor, loading the first usable font from the style's
    /// candidates, the system defaults, or the built-in font.
    pub fn new(style: OverlayStyle) -> Self {
        let font = FontProvider::preferring(style.font_candidates.iter().cloned()).load();
        Self::with_font(style, font)
    }

    pub fn with_font(style: OverlayStyle, font: LoadedFont) -> Self {
        Self { style, font }
    }

    pub fn font(&self) -> &LoadedFont {
        &self.font
    }

    /// Draws `label` and `place` onto one frame.
    pub fn annotate_frame(&self, image: &mut RgbaImage, label: &str, place: &str) {
        let frame = image.dimensions();
        self.draw_text(image, label, self.style.label_scale, Anchor::TopRight, frame);
        self.draw_text(image, place, self.style.place_scale, Anchor::BottomLeft, frame);
    }

    fn draw_text(&self, image: &mut RgbaImage, text: &str, scale: f32, anchor: Anchor, frame: (u32, u32)) {
        let px = self.style.font_px(scale, frame.1);
        let size = self.font.measure(text, px);
        let placement = self.style.place(anchor, size, px, frame);

        if let Some(rect) = placement.backing {
            let alpha = (self.style.box_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
            let radius = self.style.corner_radius(&rect);
            fill_rounded_rect(image, rect, radius, Rgba([0, 0, 0, alpha]));
        }
        let (x, y) = placement.origin;
        self.font.draw(image, text, x, y, px, TEXT_COLOR);
    }

    /// Annotates every frame of the animation at `path` in place.
    ///
    /// Frame `i` gets `labels[i]`; frames without a label get an empty one.
    pub fn annotate(
        &self,
        path: &Path,
        labels: &[String],
        place: &str,
    ) -> Result<OverlaySummary, OverlayError> {
        tracing::info!(
            path = %path.display(),
            labels = labels.len(),
            place,
            font = %self.font.describe(),
            "Annotating frames"
        );

        let frames = self.rewrite(path, |index, image| {
            let label = labels.get(index).map(String::as_str).unwrap_or("");
            if image.width() == 0 || image.height() == 0 {
                return Err(OverlayError::Draw {
                    frame: index,
                    message: "empty frame".into(),
                });
            }
            self.annotate_frame(image, label, place);
            Ok(())
        })?;

        if frames != labels.len() {
            tracing::warn!(frames, labels = labels.len(), "Label count does not match frame count");
        }

        Ok(OverlaySummary {
            frames,
            font: self.font.describe(),
        })
    }

    /// Decodes `path`, applies `edit` to each frame, and atomically replaces
    /// the file. Returns the frame count.
    pub(crate) fn rewrite<F>(&self, path: &Path, mut edit: F) -> Result<usize, OverlayError>
    where
        F: FnMut(usize, &mut RgbaImage) -> Result<(), OverlayError>,
    {
        let frames = read_animation(path)?;
        if frames.is_empty() {
            return Err(OverlayError::NoFrames);
        }

        let edited = frames
            .into_iter()
            .enumerate()
            .map(|(index, frame)| {
                let (left, top, delay) = (frame.left(), frame.top(), frame.delay());
                let mut image = frame.into_buffer();
                edit(index, &mut image)?;
                Ok(Frame::from_parts(image, left, top, delay))
            })
            .collect::<Result<Vec<_>, OverlayError>>()?;

        let count = edited.len();
        write_animation(path, edited)?;
        Ok(count)
    }
}

impl FrameAnnotator for OverlayCompositor {
    fn annotate(
        &self,
        path: &Path,
        labels: &[String],
        place: &str,
    ) -> Result<OverlaySummary, OverlayError> {
        OverlayCompositor::annotate(self, path, labels, place)
    }
}

impl Default for OverlayCompositor {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}
