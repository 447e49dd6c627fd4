//! Source metadata via `ffprobe -of json`.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_common::timing;

/// What the pipeline needs to know about a source before decoding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub frame_rate: f64,
    pub has_audio: bool,
    pub video_codec: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_secs(raw: Option<&str>) -> Option<f64> {
    raw?.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// Interpret ffprobe's JSON report for `path`.
pub fn parse_probe_json(path: &Path, json: &str) -> SpinoffResult<MediaInfo> {
    let report: ProbeOutput = serde_json::from_str(json).map_err(|e| {
        SpinoffError::source_unreadable(path, format!("unparseable ffprobe output: {e}"))
    })?;

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| SpinoffError::source_unreadable(path, "no video stream"))?;
    let has_audio = report.streams.iter().any(|s| s.codec_type == "audio");

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(SpinoffError::source_unreadable(
                path,
                "video stream has no usable dimensions",
            ))
        }
    };

    // avg_frame_rate is "0/0" for some containers; fall back to r_frame_rate.
    let frame_rate = [&video.avg_frame_rate, &video.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|raw| timing::parse_rate(raw))
        .ok_or_else(|| SpinoffError::source_unreadable(path, "video stream has no frame rate"))?;

    let duration_secs = parse_secs(report.format.duration.as_deref())
        .or_else(|| parse_secs(video.duration.as_deref()))
        .ok_or_else(|| SpinoffError::source_unreadable(path, "duration unknown"))?;

    Ok(MediaInfo {
        width,
        height,
        duration_secs,
        frame_rate,
        has_audio,
        video_codec: video.codec_name.clone(),
    })
}

/// Run `ffprobe` on `path`.
pub fn probe(ffprobe: &Path, path: &Path) -> SpinoffResult<MediaInfo> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-of",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            SpinoffError::source_unreadable(
                path,
                format!("failed to run {}: {e}", ffprobe.display()),
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SpinoffError::source_unreadable(
            path,
            format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    let info = parse_probe_json(path, &String::from_utf8_lossy(&output.stdout))?;
    tracing::debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        duration_secs = info.duration_secs,
        frame_rate = info.frame_rate,
        has_audio = info.has_audio,
        "Probed source"
    );
    Ok(info)
}
