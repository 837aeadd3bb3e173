//! Animated GIF container I/O.
//!
//! Writes go to a temporary file next to the destination and are renamed
//! into place, so an existing artifact is either fully replaced or left
//! untouched.

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, Frame, ImageError};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// LZW effort passed to the GIF encoder (1 = best, 30 = fastest).
const ENCODER_SPEED: i32 = 10;

/// Errors reading or writing an animation.
#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("GIF codec error: {0}")]
    Codec(#[from] ImageError),
}

impl AnimationError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Per-frame display delay for a frame rate.
pub fn frame_delay(fps: u32) -> Delay {
    Delay::from_numer_denom_ms(1000, fps.max(1))
}

/// Delay in milliseconds, fractional for rates that do not divide 1000.
pub fn delay_ms(delay: Delay) -> f64 {
    let (numer, denom) = delay.numer_denom_ms();
    numer as f64 / denom.max(1) as f64
}

/// Encodes `frames` as a looping GIF at `path`, replacing any existing file.
pub fn write_animation<I>(path: &Path, frames: I) -> Result<(), AnimationError>
where
    I: IntoIterator<Item = Frame>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".timelapse-")
        .suffix(".gif.part")
        .tempfile_in(dir)
        .map_err(|e| AnimationError::io(dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        {
            let mut encoder = GifEncoder::new_with_speed(&mut writer, ENCODER_SPEED);
            encoder.set_repeat(Repeat::Infinite)?;
            encoder.encode_frames(frames)?;
        }
        writer.flush().map_err(|e| AnimationError::io(path, e))?;
    }

    tmp.persist(path)
        .map_err(|e| AnimationError::io(path, e.error))?;
    Ok(())
}

/// Decodes every frame of the GIF at `path`, with its delay.
pub fn read_animation(path: &Path) -> Result<Vec<Frame>, AnimationError> {
    let file = File::open(path).map_err(|e| AnimationError::io(path, e))?;
    let decoder = GifDecoder::new(BufReader::new(file))?;
    Ok(decoder.into_frames().collect_frames()?)
}
