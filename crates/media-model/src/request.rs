//! Transform requests, results, and output naming.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Extension used when the source has none.
pub const DEFAULT_EXTENSION: &str = "mp4";

/// One spin-off to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Readable video file.
    pub source: PathBuf,
    /// Platform tag as supplied by the caller; validated when resolved.
    pub platform: String,
    /// Directory to write into instead of the source's directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl TransformRequest {
    pub fn new(source: impl Into<PathBuf>, platform: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            platform: platform.into(),
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// What a successful transform produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    pub output_path: PathBuf,
    pub platform: Platform,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    /// Wall-clock time spent loading, transforming, and encoding.
    pub elapsed_secs: f64,
}

/// Output path for a spin-off of `source`: `<stem>_spinoff_<platform><ext>`.
///
/// Written next to the source unless `output_dir` is given. Two concurrent
/// requests for the same source and platform resolve to the same path; the
/// last one to finish wins.
pub fn output_path_for(source: &Path, platform: Platform, output_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    let file_name = format!("{stem}_spinoff_{}.{ext}", platform.as_str());

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_next_to_source() {
        let out = output_path_for(Path::new("downloads/clip.mov"), Platform::Twitter, None);
        assert_eq!(out, PathBuf::from("downloads/clip_spinoff_twitter.mov"));
    }

    #[test]
    fn test_missing_extension_defaults_to_mp4() {
        let out = output_path_for(Path::new("/data/raw"), Platform::Instagram, None);
        assert_eq!(out, PathBuf::from("/data/raw_spinoff_instagram.mp4"));
    }

    #[test]
    fn test_bare_file_name() {
        let out = output_path_for(Path::new("clip.mp4"), Platform::Youtube, None);
        assert_eq!(out, PathBuf::from("clip_spinoff_youtube.mp4"));
    }

    #[test]
    fn test_output_dir_override() {
        let out = output_path_for(
            Path::new("/in/clip.webm"),
            Platform::Facebook,
            Some(Path::new("/out")),
        );
        assert_eq!(out, PathBuf::from("/out/clip_spinoff_facebook.webm"));
    }

    #[test]
    fn test_request_builder() {
        let req = TransformRequest::new("a.mp4", "pinterest").with_output_dir("/tmp/x");
        assert_eq!(req.output_dir, Some(PathBuf::from("/tmp/x")));
    }
}
