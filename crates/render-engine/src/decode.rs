//! Source decoding through an `ffmpeg` subprocess emitting raw RGB frames.

use std::io::{BufReader, ErrorKind as IoErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use image::RgbImage;
use spinoff_common::config::{EncoderDefaults, ValidationConfig};
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_media_model::asset::{AudioTrack, Frame, FrameIter, FrameSource, VideoAsset};
use spinoff_media_model::geometry::Dimensions;
use spinoff_processing_core::AssetLoader;

use crate::probe::{probe, MediaInfo};
use crate::validate::validate_media;

/// Loads sources by validating, probing, then decoding lazily with ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    validation: ValidationConfig,
}

impl FfmpegLoader {
    pub fn new(encoder: &EncoderDefaults, validation: &ValidationConfig) -> Self {
        Self {
            ffmpeg: encoder.ffmpeg_path.clone(),
            ffprobe: encoder.ffprobe_path.clone(),
            validation: validation.clone(),
        }
    }
}

impl AssetLoader for FfmpegLoader {
    fn load(&self, source: &Path) -> SpinoffResult<VideoAsset> {
        validate_media(source, &self.validation)?;
        let info = probe(&self.ffprobe, source)?;
        asset_from_info(&self.ffmpeg, source, &info)
    }
}

/// Build an asset whose frames are decoded from `source` on demand.
pub fn asset_from_info(ffmpeg: &Path, source: &Path, info: &MediaInfo) -> SpinoffResult<VideoAsset> {
    let dimensions = Dimensions::new(info.width, info.height);
    let frames = FfmpegFrameSource {
        ffmpeg: ffmpeg.to_path_buf(),
        path: source.to_path_buf(),
        dimensions,
        frame_rate: info.frame_rate,
    };
    let audio = info.has_audio.then(|| AudioTrack::from_source(source));
    VideoAsset::new(
        source,
        dimensions,
        info.duration_secs,
        info.frame_rate,
        audio,
        Arc::new(frames),
    )
    .map_err(|e| SpinoffError::source_unreadable(source, e.to_string()))
}

/// Decodes the first video stream of a file at a constant frame rate.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    ffmpeg: PathBuf,
    path: PathBuf,
    dimensions: Dimensions,
    frame_rate: f64,
}

impl FfmpegFrameSource {
    fn args(&self) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            self.path.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-an".to_string(),
            "-sn".to_string(),
            "-r".to_string(),
            format!("{}", self.frame_rate),
            "-s".to_string(),
            self.dimensions.to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        let unreadable = |reason: String| SpinoffError::source_unreadable(&self.path, reason);

        let mut child = Command::new(&self.ffmpeg)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unreadable(format!("failed to start {}: {e}", self.ffmpeg.display())))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| unreadable("failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| unreadable("failed to capture ffmpeg stderr".to_string()))?;

        // ffmpeg blocks once its stderr pipe fills.
        let stderr_task = std::thread::spawn(move || {
            let mut output = String::new();
            match BufReader::new(stderr).read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::debug!(
            pid = child.id(),
            path = %self.path.display(),
            dimensions = %self.dimensions,
            "Decoder started"
        );

        Ok(Box::new(RawFrameReader {
            path: self.path.clone(),
            child: Some(child),
            stdout: BufReader::new(stdout),
            stderr_task: Some(stderr_task),
            dimensions: self.dimensions,
            next_index: 0,
            done: false,
        }))
    }
}

/// One decoding pass. Kills the child if dropped early.
struct RawFrameReader {
    path: PathBuf,
    child: Option<Child>,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    dimensions: Dimensions,
    next_index: u64,
    done: bool,
}

impl RawFrameReader {
    fn finish(&mut self) -> SpinoffResult<()> {
        self.done = true;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| {
            SpinoffError::source_unreadable(&self.path, format!("failed to wait on ffmpeg: {e}"))
        })?;
        let stderr = self
            .stderr_task
            .take()
            .and_then(|task| task.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(SpinoffError::source_unreadable(
                &self.path,
                format!("decoder exited with {status}: {}", stderr.trim()),
            ));
        }
        if self.next_index == 0 {
            return Err(SpinoffError::source_unreadable(
                &self.path,
                "decoder produced no frames",
            ));
        }
        Ok(())
    }
}

impl Iterator for RawFrameReader {
    type Item = SpinoffResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; self.dimensions.rgb_len()];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::UnexpectedEof => {
                return self.finish().err().map(Err);
            }
            Err(e) => {
                self.done = true;
                return Some(Err(SpinoffError::source_unreadable(
                    &self.path,
                    format!("failed reading decoded frame: {e}"),
                )));
            }
        }

        let image = RgbImage::from_raw(self.dimensions.width, self.dimensions.height, buf)?;
        let frame = Frame::new(self.next_index, image);
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Drop for RawFrameReader {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(task) = self.stderr_task.take() {
            let _ = task.join();
        }
    }
}
