//! Font selection for overlay text.
//!
//! Candidates are tried in order and the first one that loads wins. The
//! candidate list always ends with the built-in bitmap font, so loading
//! never fails.

use super::draw::blend;
use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgba, RgbaImage};
use std::path::PathBuf;

/// Side length of a built-in glyph cell, in pixels at scale 1.
const BITMAP_CELL: u32 = 8;

/// Outline fonts commonly present on Linux and macOS hosts.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// One place a font may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// A TrueType/OpenType file on disk.
    Path(PathBuf),
    /// The built-in 8×8 bitmap font.
    BuiltinDefault,
}

/// Ordered font candidates ending in [`FontSource::BuiltinDefault`].
#[derive(Debug, Clone)]
pub struct FontProvider {
    candidates: Vec<FontSource>,
}

impl FontProvider {
    /// Tries `paths` in order, then the built-in font.
    pub fn with_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut candidates: Vec<FontSource> = paths.into_iter().map(FontSource::Path).collect();
        candidates.push(FontSource::BuiltinDefault);
        Self { candidates }
    }

    /// Tries `paths` first, then common system font locations, then the
    /// built-in font.
    pub fn preferring<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self::with_paths(
            paths
                .into_iter()
                .chain(SYSTEM_FONT_PATHS.iter().map(PathBuf::from)),
        )
    }

    /// Common system font locations, then the built-in font.
    pub fn system_default() -> Self {
        Self::preferring(std::iter::empty())
    }

    pub fn candidates(&self) -> &[FontSource] {
        &self.candidates
    }

    /// Loads the first usable candidate.
    pub fn load(&self) -> LoadedFont {
        for candidate in &self.candidates {
            match candidate {
                FontSource::Path(path) => {
                    let loaded = std::fs::read(path)
                        .map_err(|e| e.to_string())
                        .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|e| e.to_string()));
                    match loaded {
                        Ok(font) => {
                            tracing::debug!(path = %path.display(), "Loaded overlay font");
                            return LoadedFont::Outline {
                                font,
                                source: path.clone(),
                            };
                        }
                        Err(e) => {
                            tracing::trace!(path = %path.display(), error = %e, "Font candidate skipped");
                        }
                    }
                }
                FontSource::BuiltinDefault => break,
            }
        }
        tracing::debug!("Using built-in bitmap font");
        LoadedFont::Builtin
    }
}

impl Default for FontProvider {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Measured extent of a rendered string, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
}

/// A font ready for drawing.
pub enum LoadedFont {
    Outline { font: FontVec, source: PathBuf },
    Builtin,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl LoadedFont {
    /// Human-readable origin of the font.
    pub fn describe(&self) -> String {
        match self {
            LoadedFont::Outline { source, .. } => source.display().to_string(),
            LoadedFont::Builtin => "built-in 8x8".to_string(),
        }
    }

    /// Bounding box of `text` rendered at `px` pixels.
    pub fn measure(&self, text: &str, px: f32) -> TextSize {
        match self {
            LoadedFont::Outline { font, .. } => {
                let scaled = font.as_scaled(PxScale::from(px));
                let mut width = 0.0f32;
                let mut previous = None;
                for c in text.chars() {
                    let id = scaled.glyph_id(c);
                    if let Some(prev) = previous {
                        width += scaled.kern(prev, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                TextSize {
                    width: width.ceil().max(0.0) as u32,
                    height: (scaled.ascent() - scaled.descent()).ceil().max(0.0) as u32,
                }
            }
            LoadedFont::Builtin => {
                let cell = bitmap_cell(px);
                TextSize {
                    width: cell * text.chars().count() as u32,
                    height: cell,
                }
            }
        }
    }

    /// Draws `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, px: f32, color: Rgba<u8>) {
        match self {
            LoadedFont::Outline { font, .. } => {
                let scaled = font.as_scaled(PxScale::from(px));
                let baseline = y as f32 + scaled.ascent();
                let mut caret = x as f32;
                let mut previous = None;

                for c in text.chars() {
                    let mut glyph = scaled.scaled_glyph(c);
                    if let Some(prev) = previous {
                        caret += scaled.kern(prev, glyph.id);
                    }
                    glyph.position = point(caret, baseline);
                    caret += scaled.h_advance(glyph.id);
                    previous = Some(glyph.id);

                    if let Some(outlined) = font.outline_glyph(glyph) {
                        let bounds = outlined.px_bounds();
                        let (ox, oy) = (bounds.min.x as i32, bounds.min.y as i32);
                        outlined.draw(|gx, gy, coverage| {
                            blend(canvas, ox + gx as i32, oy + gy as i32, color, coverage);
                        });
                    }
                }
            }
            LoadedFont::Builtin => {
                let cell = bitmap_cell(px);
                let dot = (cell / BITMAP_CELL) as i32;
                for (i, c) in text.chars().enumerate() {
                    let rows = BASIC_FONTS
                        .get(c)
                        .or_else(|| LATIN_FONTS.get(c))
                        .or_else(|| BASIC_FONTS.get('?'))
                        .unwrap_or([0; 8]);
                    let gx = x + (i as u32 * cell) as i32;
                    for (row, bits) in rows.iter().enumerate() {
                        for col in 0..BITMAP_CELL as i32 {
                            if bits & (1 << col) == 0 {
                                continue;
                            }
                            for dy in 0..dot {
                                for dx in 0..dot {
                                    blend(
                                        canvas,
                                        gx + col * dot + dx,
                                        y + row as i32 * dot + dy,
                                        color,
                                        1.0,
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Cell size of the built-in font for a requested pixel size.
fn bitmap_cell(px: f32) -> u32 {
    let scale = (px / BITMAP_CELL as f32).round().max(1.0) as u32;
    scale * BITMAP_CELL
}
