//! Secondary-format transcoding.
//!
//! The MP4 copy of the animation is produced by an external tool. Its
//! availability is probed once at startup; a missing tool or a failed run
//! is never fatal to the pipeline.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Errors raised by a transcoder.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("{0} not found on PATH")]
    NotFound(String),
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Converts the primary animation into another container.
pub trait Transcoder {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Converts `input` into `output`, overwriting it.
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// Transcodes GIF to H.264 MP4 with ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Locates `ffmpeg` on `PATH`.
    pub fn probe() -> Result<Self, TranscodeError> {
        let program = which::which("ffmpeg").map_err(|_| TranscodeError::NotFound("ffmpeg".into()))?;
        tracing::debug!(program = %program.display(), "Found ffmpeg");
        Ok(Self { program })
    }

    /// Uses an explicit ffmpeg binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for one conversion. Dimensions are rounded down to even
    /// values, which yuv420p requires.
    pub fn build_args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-loglevel".into(), "error".into(), "-i".into()];
        args.push(input.as_os_str().to_os_string());
        args.extend(
            [
                "-movflags",
                "faststart",
                "-pix_fmt",
                "yuv420p",
                "-vf",
                "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_os_string());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args = Self::build_args(input, output);
        tracing::debug!(
            "Running {} {}",
            self.program.display(),
            args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ")
        );

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                program: self.name().to_string(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
