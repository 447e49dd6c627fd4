//! Encoding a transformed asset into its output container.
//!
//! Frames are piped to `ffmpeg` as raw RGB on stdin; the original source is
//! opened as a second input for its audio, with the asset's audio edits
//! translated into an `-af` chain. Output goes to a hidden sibling file that
//! is renamed into place only after ffmpeg exits cleanly, so a failed or
//! cancelled encode never leaves a partial output behind.

use std::io::{BufReader, ErrorKind as IoErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use spinoff_common::cancel::CancelToken;
use spinoff_common::config::EncoderDefaults;
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_media_model::asset::{AudioOp, VideoAsset};
use spinoff_media_model::profile::EncodeSettings;

/// Something that writes a finished asset to disk.
pub trait EncodeBackend: Send + Sync {
    /// Write `asset` to `output`. On error nothing is left at `output`.
    fn encode(
        &self,
        asset: &VideoAsset,
        settings: &EncodeSettings,
        output: &Path,
        cancel: &CancelToken,
    ) -> SpinoffResult<EncodeSummary>;

    /// Check if this backend is usable on this system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// What an encode wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSummary {
    pub output_path: PathBuf,
    pub frames_written: u64,
    pub elapsed_secs: f64,
}

/// `atempo` only accepts factors in `[0.5, 2.0]`; larger changes are chained.
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Split a tempo factor into `atempo`-sized steps whose product is `factor`.
pub fn atempo_steps(factor: f64) -> Vec<f64> {
    let mut steps = Vec::new();
    if !(factor.is_finite() && factor > 0.0) {
        return steps;
    }
    let mut remaining = factor;
    while remaining > ATEMPO_MAX {
        steps.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        steps.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    if (remaining - 1.0).abs() > 1e-9 || steps.is_empty() {
        steps.push(remaining);
    }
    steps
}

/// Translate audio edits into an ffmpeg filter chain. `None` when there is
/// nothing to do.
pub fn audio_filter(ops: &[AudioOp]) -> Option<String> {
    let filters: Vec<String> = ops
        .iter()
        .flat_map(|op| match *op {
            AudioOp::Trim { end_secs } => vec![
                format!("atrim=end={end_secs:.6}"),
                "asetpts=PTS-STARTPTS".to_string(),
            ],
            AudioOp::Tempo { factor } => atempo_steps(factor)
                .into_iter()
                .map(|step| format!("atempo={step:.6}"))
                .collect(),
            AudioOp::PadSilence { secs } => vec![format!("apad=pad_dur={secs:.6}")],
            AudioOp::Delay { secs } => {
                vec![format!("adelay=delays={}:all=1", (secs * 1000.0).round() as u64)]
            }
        })
        .collect();
    (!filters.is_empty()).then(|| filters.join(","))
}

/// Hidden sibling used while encoding: `dir/.name.partial.ext`.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!(".{stem}.partial.{}", ext.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };
    output.with_file_name(name)
}

/// Removes the partial file on drop unless the encode was committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    fn commit(mut self, output: &Path) -> std::io::Result<()> {
        std::fs::rename(&self.path, output)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial output");
            }
        }
    }
}

/// Encoder driving an `ffmpeg` subprocess.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    max_threads: usize,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, max_threads: usize) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            max_threads: max_threads.max(1),
        }
    }

    pub fn from_config(config: &EncoderDefaults) -> Self {
        Self::new(config.ffmpeg_path.clone(), config.resolved_threads())
    }

    /// Container-specific codec arguments. WebM cannot carry H.264/AAC, so
    /// it gets VP9/Opus at the same bitrates.
    fn codec_args(settings: &EncodeSettings, output: &Path) -> Vec<String> {
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let mut args = Vec::new();
        match ext.as_str() {
            "webm" => {
                args.extend([
                    "-c:v".to_string(),
                    "libvpx-vp9".to_string(),
                    "-b:v".to_string(),
                    settings.bitrate_arg(),
                ]);
                args.extend(["-pix_fmt".to_string(), settings.pixel_format.clone()]);
                args.extend([
                    "-c:a".to_string(),
                    "libopus".to_string(),
                    "-b:a".to_string(),
                    settings.audio_bitrate_arg(),
                ]);
            }
            _ => {
                args.extend([
                    "-c:v".to_string(),
                    settings.video_codec.clone(),
                    "-preset".to_string(),
                    settings.preset.as_str().to_string(),
                    "-b:v".to_string(),
                    settings.bitrate_arg(),
                    "-pix_fmt".to_string(),
                    settings.pixel_format.clone(),
                    "-c:a".to_string(),
                    settings.audio_codec.clone(),
                    "-b:a".to_string(),
                    settings.audio_bitrate_arg(),
                ]);
                if matches!(ext.as_str(), "mp4" | "mov" | "m4v") {
                    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
                }
            }
        }
        args
    }

    /// Full ffmpeg argument list for writing `asset` to `target`.
    pub fn build_args(
        &self,
        asset: &VideoAsset,
        settings: &EncodeSettings,
        target: &Path,
    ) -> Vec<String> {
        let settings = settings.with_threads(self.max_threads);
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-v",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(asset.dimensions().to_string());
        args.extend(["-r".to_string(), format!("{}", asset.frame_rate())]);
        args.extend(["-i".to_string(), "pipe:0".to_string()]);

        match asset.audio() {
            Some(audio) => {
                args.extend([
                    "-i".to_string(),
                    audio.source.to_string_lossy().into_owned(),
                    "-map".to_string(),
                    "0:v:0".to_string(),
                    "-map".to_string(),
                    "1:a:0".to_string(),
                ]);
                if let Some(chain) = audio_filter(&audio.ops) {
                    args.extend(["-af".to_string(), chain]);
                }
            }
            None => {
                args.extend(["-map".to_string(), "0:v:0".to_string(), "-an".to_string()]);
            }
        }

        args.extend(Self::codec_args(&settings, target));
        args.extend([
            "-threads".to_string(),
            settings.threads.to_string(),
            "-t".to_string(),
            format!("{:.6}", asset.duration_secs()),
            target.to_string_lossy().into_owned(),
        ]);
        args
    }

    fn run(
        &self,
        asset: &VideoAsset,
        settings: &EncodeSettings,
        output: &Path,
        partial: &Path,
        cancel: &CancelToken,
    ) -> SpinoffResult<u64> {
        let args = self.build_args(asset, settings, partial);
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SpinoffError::encode_io(
                    output,
                    format!("failed to start {}", self.ffmpeg.display()),
                    e,
                )
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SpinoffError::encode_failed(output, "failed to capture ffmpeg stderr"))?;
        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut output = String::new();
            match BufReader::new(stderr).read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let written = match child.stdin.take() {
            Some(mut stdin) => write_frames(asset, &mut stdin, output, cancel),
            None => Err(SpinoffError::encode_failed(
                output,
                "failed to capture ffmpeg stdin",
            )),
        };

        if written.is_err() {
            let _ = child.kill();
        }
        let status = child
            .wait()
            .map_err(|e| SpinoffError::encode_io(output, "failed to wait on ffmpeg", e));
        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        // A broken pipe means ffmpeg died first; its stderr says why.
        let frames = match written {
            Err(SpinoffError::EncodeFailed {
                source: Some(ref io),
                ..
            }) if io.kind() == IoErrorKind::BrokenPipe => {
                return Err(SpinoffError::encode_failed(
                    output,
                    format!("ffmpeg closed its input: {}", stderr_output.trim()),
                ));
            }
            other => other?,
        };

        let status = status?;
        if !status.success() {
            return Err(SpinoffError::encode_failed(
                output,
                format!("ffmpeg exited with {status}: {}", stderr_output.trim()),
            ));
        }
        Ok(frames)
    }
}

/// Stream exactly `asset.frame_count()` frames into `sink`, holding the last
/// frame if the source runs short.
pub fn write_frames(
    asset: &VideoAsset,
    sink: &mut impl Write,
    output: &Path,
    cancel: &CancelToken,
) -> SpinoffResult<u64> {
    let expected = asset.frame_count();
    let dims = asset.dimensions();
    let mut frames = asset.open_frames()?;
    let mut last: Option<Vec<u8>> = None;
    let mut written = 0u64;

    while written < expected {
        cancel.check(&format!("while encoding frame {written}"))?;

        let bytes = match frames.next() {
            Some(frame) => {
                let frame = frame?;
                if frame.dimensions() != dims {
                    return Err(SpinoffError::encode_failed(
                        output,
                        format!(
                            "frame {} is {}, expected {dims}",
                            frame.index,
                            frame.dimensions()
                        ),
                    ));
                }
                frame.image.into_raw()
            }
            None => match last.take() {
                Some(bytes) => bytes,
                None => return Err(SpinoffError::encode_failed(output, "asset produced no frames")),
            },
        };

        sink.write_all(&bytes)
            .map_err(|e| SpinoffError::encode_io(output, "failed writing frame to encoder", e))?;
        last = Some(bytes);
        written += 1;
    }

    sink.flush()
        .map_err(|e| SpinoffError::encode_io(output, "failed flushing encoder input", e))?;
    Ok(written)
}

impl EncodeBackend for FfmpegEncoder {
    fn encode(
        &self,
        asset: &VideoAsset,
        settings: &EncodeSettings,
        output: &Path,
        cancel: &CancelToken,
    ) -> SpinoffResult<EncodeSummary> {
        let start = Instant::now();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SpinoffError::encode_io(output, "failed to create output directory", e)
            })?;
        }

        let partial = PartialFile::new(partial_path(output));
        tracing::info!(
            output = %output.display(),
            dimensions = %asset.dimensions(),
            duration_secs = asset.duration_secs(),
            bitrate = %settings.bitrate_arg(),
            preset = settings.preset.as_str(),
            "Encoding"
        );

        let frames_written = self.run(asset, settings, output, &partial.path, cancel)?;
        partial
            .commit(output)
            .map_err(|e| SpinoffError::encode_io(output, "failed to move output into place", e))?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            output = %output.display(),
            frames_written,
            elapsed_secs,
            "Encode complete"
        );
        Ok(EncodeSummary {
            output_path: output.to_path_buf(),
            frames_written,
            elapsed_secs,
        })
    }

    fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
