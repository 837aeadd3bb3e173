//! Frame rendering and video assembly.
//!
//! Every smoothed composite goes through the same fixed linear stretch,
//! so brightness never drifts between frames. The display frames are then
//! assembled into a looping GIF at the run's frame rate.

mod animation;

pub use animation::{delay_ms, frame_delay, read_animation, write_animation, AnimationError};

use crate::composite::{Band, Composite};
use image::{Frame, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no frames to render")]
    Empty,
    #[error("invalid frame rate {0}")]
    InvalidFrameRate(u32),
    #[error("invalid visualization parameters: {0}")]
    InvalidVisualization(String),
    #[error("failed to write animation: {0}")]
    Animation(#[from] AnimationError),
}

/// Linear stretch from reflectance to display bytes.
///
/// Values are mapped from `[min, max]` to `[0, 255]` and clipped. A gamma
/// other than 1 brightens (> 1) or darkens (< 1) mid-tones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisParams {
    pub min: f32,
    pub max: f32,
    pub gamma: f32,
}

impl Default for VisParams {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.3,
            gamma: 1.0,
        }
    }
}

impl VisParams {
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.max <= self.min {
            return Err(RenderError::InvalidVisualization(format!(
                "range [{}, {}] is empty",
                self.min, self.max
            )));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(RenderError::InvalidVisualization(format!(
                "gamma {} must be positive",
                self.gamma
            )));
        }
        Ok(())
    }

    /// Maps one reflectance sample to a display byte. Masked samples are black.
    #[inline]
    pub fn stretch(&self, value: f32) -> u8 {
        if value.is_nan() {
            return 0;
        }
        let mut t = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        if self.gamma != 1.0 {
            t = t.powf(1.0 / self.gamma);
        }
        (t * 255.0).round() as u8
    }

    /// Renders a composite as an opaque RGBA image.
    pub fn visualize(&self, composite: &Composite) -> RgbaImage {
        let red = composite.band(Band::Red).samples();
        let green = composite.band(Band::Green).samples();
        let blue = composite.band(Band::Blue).samples();
        let width = composite.width();

        RgbaImage::from_fn(composite.width(), composite.height(), |x, y| {
            let i = (y * width + x) as usize;
            Rgba([
                self.stretch(red[i]),
                self.stretch(green[i]),
                self.stretch(blue[i]),
                255,
            ])
        })
    }
}

/// The primary video artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub frames: usize,
    pub width: u32,
    pub height: u32,
    pub frame_delay_ms: f64,
}

/// Turns smoothed composites into the primary video.
#[derive(Debug, Clone, Default)]
pub struct FrameRenderer {
    vis: VisParams,
}

impl FrameRenderer {
    pub fn new(vis: VisParams) -> Self {
        Self { vis }
    }

    /// Renders `smoothed` to a looping GIF at `path`.
    pub fn render(
        &self,
        smoothed: &[Composite],
        fps: u32,
        path: &Path,
    ) -> Result<RenderedVideo, RenderError> {
        self.vis.validate()?;
        if fps == 0 {
            return Err(RenderError::InvalidFrameRate(fps));
        }
        let first = smoothed.first().ok_or(RenderError::Empty)?;
        let delay = frame_delay(fps);

        tracing::info!(
            frames = smoothed.len(),
            width = first.width(),
            height = first.height(),
            fps,
            min = self.vis.min,
            max = self.vis.max,
            gamma = self.vis.gamma,
            path = %path.display(),
            "Rendering frames"
        );

        let frames = smoothed
            .iter()
            .map(|c| Frame::from_parts(self.vis.visualize(c), 0, 0, delay));
        write_animation(path, frames)?;

        Ok(RenderedVideo {
            path: path.to_path_buf(),
            frames: smoothed.len(),
            width: first.width(),
            height: first.height(),
            frame_delay_ms: delay_ms(delay),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::BandRaster;
    use crate::region::PixelGrid;

    #[test]
    fn test_stretch_range() {
        let vis = VisParams::default();
        assert_eq!(vis.stretch(0.0), 0);
        assert_eq!(vis.stretch(-0.1), 0);
        assert!((127..=128).contains(&vis.stretch(0.15)));
        assert_eq!(vis.stretch(0.3), 255);
        assert_eq!(vis.stretch(0.9), 255);
        assert_eq!(vis.stretch(f32::NAN), 0);
    }

    #[test]
    fn test_gamma_brightens() {
        let bright = VisParams {
            gamma: 2.0,
            ..Default::default()
        };
        assert!(bright.stretch(0.075) > VisParams::default().stretch(0.075));
        assert_eq!(bright.stretch(0.3), 255);
    }

    #[test]
    fn test_invalid_params() {
        let inverted = VisParams {
            min: 0.3,
            max: 0.0,
            gamma: 1.0,
        };
        assert!(inverted.validate().is_err());
        let zero_gamma = VisParams {
            gamma: 0.0,
            ..Default::default()
        };
        assert!(zero_gamma.validate().is_err());
    }

    #[test]
    fn test_visualize_band_order() {
        let grid = PixelGrid::new(2, 1);
        let composite = Composite::new(
            0,
            BandRaster::filled(grid, 0.3),
            BandRaster::filled(grid, 0.0),
            BandRaster::new(2, 1, vec![0.0, 0.3]).unwrap(),
        )
        .unwrap();

        let image = VisParams::default().visualize(&composite);
        assert_eq!(image.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([255, 0, 255, 255]));
    }

    #[test]
    fn test_render_writes_gif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.gif");
        let grid = PixelGrid::new(16, 12);
        let frames: Vec<_> = (0..5)
            .map(|i| Composite::uniform(i, grid, 0.05 * i as f32))
            .collect();

        let video = FrameRenderer::default().render(&frames, 5, &path).unwrap();

        assert_eq!(video.frames, 5);
        assert_eq!((video.width, video.height), (16, 12));
        assert_eq!(video.frame_delay_ms, 200.0);
        assert_eq!(read_animation(&path).unwrap().len(), 5);
    }

    #[test]
    fn test_render_rejects_empty_and_zero_fps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.gif");
        let renderer = FrameRenderer::default();
        assert!(matches!(renderer.render(&[], 10, &path), Err(RenderError::Empty)));

        let one = [Composite::uniform(0, PixelGrid::new(2, 2), 0.1)];
        assert!(matches!(
            renderer.render(&one, 0, &path),
            Err(RenderError::InvalidFrameRate(0))
        ));
        assert!(!path.exists());
    }
}
