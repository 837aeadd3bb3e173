//! Artifact naming.

use super::config::DEFAULT_OUTPUT;
use std::path::{Path, PathBuf};

/// Paths of the primary animation and its transcoded copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub primary: PathBuf,
    pub secondary: PathBuf,
}

impl OutputPaths {
    /// Derives artifact paths from the output base name.
    ///
    /// The default base name becomes `timelapse_<place>`, where `<place>` is
    /// the first comma-separated segment of the place name with spaces
    /// replaced by underscores. A name already ending in `.gif` is used as
    /// is. The MP4 shares the GIF's base name. Identical inputs always map
    /// to identical paths.
    pub fn derive(place: &str, output: &str, dir: &Path) -> Self {
        let base = if output == DEFAULT_OUTPUT {
            match place_slug(place) {
                slug if slug.is_empty() => DEFAULT_OUTPUT.to_string(),
                slug => format!("{DEFAULT_OUTPUT}_{slug}"),
            }
        } else {
            output.strip_suffix(".gif").unwrap_or(output).to_string()
        };

        Self {
            primary: dir.join(format!("{base}.gif")),
            secondary: dir.join(format!("{base}.mp4")),
        }
    }
}

fn place_slug(place: &str) -> String {
    place
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_from_place() {
        let paths = OutputPaths::derive("Udine, Italy", "timelapse", Path::new("out"));
        assert_eq!(paths.primary, Path::new("out/timelapse_Udine.gif"));
        assert_eq!(paths.secondary, Path::new("out/timelapse_Udine.mp4"));
    }

    #[test]
    fn test_spaces_become_underscores() {
        let paths = OutputPaths::derive(" New York City , NY, USA", "timelapse", Path::new("."));
        assert_eq!(paths.primary, Path::new("./timelapse_New_York_City.gif"));
    }

    #[test]
    fn test_explicit_names() {
        let paths = OutputPaths::derive("Udine", "alps", Path::new("."));
        assert_eq!(paths.primary, Path::new("./alps.gif"));
        assert_eq!(paths.secondary, Path::new("./alps.mp4"));

        let paths = OutputPaths::derive("Udine", "alps.gif", Path::new("."));
        assert_eq!(paths.primary, Path::new("./alps.gif"));
        assert_eq!(paths.secondary, Path::new("./alps.mp4"));
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let a = OutputPaths::derive("Udine, Italy", "timelapse", Path::new("runs"));
        let b = OutputPaths::derive("Udine, Italy", "timelapse", Path::new("runs"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_place_segment() {
        let paths = OutputPaths::derive(", Italy", "timelapse", Path::new("."));
        assert_eq!(paths.primary, Path::new("./timelapse.gif"));
    }
}
