//! Platform recipes: stages, duration caps, target geometry, encode settings.

use serde::{Deserialize, Serialize};
use spinoff_common::error::{SpinoffError, SpinoffResult};

use crate::platform::Platform;

/// How a resize stage maps source geometry to its output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResizeMode {
    /// Scale to exactly `width x height`, ignoring the source aspect ratio.
    Fit { width: u32, height: u32 },
    /// Scale to a `max(w, h)` square by stretching the shorter side.
    Square,
    /// Scale to an exact portrait target.
    Vertical { width: u32, height: u32 },
    /// Scale both sides by `factor`, then center-crop back to the input size.
    ScaleCrop { factor: f64 },
}

/// What a composite stage draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    /// Dimmed frame with a centered end card.
    EndScreen,
    /// Center zoom emphasising the opening seconds.
    ZoomedIntro,
}

/// Which end of the asset a composite window is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Start,
    End,
}

/// How a composite segment combines with the main segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Drawn on top of the window; total duration is unchanged.
    Overlay,
    /// Spliced before (start anchor) or after (end anchor) the main segment;
    /// total duration grows by the window length.
    Append,
}

/// Per-pixel filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFilterKind {
    Vignette,
}

/// A single named, parameterized transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Cut everything after `max_secs`.
    Trim { max_secs: f64 },
    Resize { mode: ResizeMode },
    /// Channel multiplier, then luminance offset and contrast around mid-gray.
    ColorAdjust {
        multiplier: f64,
        luminance_delta: f64,
        contrast_delta: f64,
    },
    /// Playback speed factor (> 1 is faster and shorter).
    SpeedAdjust { factor: f64 },
    Composite {
        overlay: OverlayKind,
        anchor: Anchor,
        offset_secs: f64,
        duration_secs: f64,
        mode: CompositeMode,
    },
    PixelFilter { kind: PixelFilterKind },
}

impl Stage {
    pub fn trim(max_secs: f64) -> Self {
        Stage::Trim { max_secs }
    }

    pub fn resize(mode: ResizeMode) -> Self {
        Stage::Resize { mode }
    }

    pub fn color(multiplier: f64, luminance_delta: f64, contrast_delta: f64) -> Self {
        Stage::ColorAdjust {
            multiplier,
            luminance_delta,
            contrast_delta,
        }
    }

    pub fn speed(factor: f64) -> Self {
        Stage::SpeedAdjust { factor }
    }

    /// Overlay the last `duration_secs` of the asset.
    pub fn end_overlay(overlay: OverlayKind, duration_secs: f64) -> Self {
        Stage::Composite {
            overlay,
            anchor: Anchor::End,
            offset_secs: 0.0,
            duration_secs,
            mode: CompositeMode::Overlay,
        }
    }

    /// Overlay the first `duration_secs` of the asset.
    pub fn start_overlay(overlay: OverlayKind, duration_secs: f64) -> Self {
        Stage::Composite {
            overlay,
            anchor: Anchor::Start,
            offset_secs: 0.0,
            duration_secs,
            mode: CompositeMode::Overlay,
        }
    }

    pub fn filter(kind: PixelFilterKind) -> Self {
        Stage::PixelFilter { kind }
    }

    /// Short human-readable name used in logs and errors.
    pub fn label(&self) -> String {
        match self {
            Stage::Trim { max_secs } => format!("trim({max_secs}s)"),
            Stage::Resize { mode } => match mode {
                ResizeMode::Fit { width, height } => format!("resize(fit {width}x{height})"),
                ResizeMode::Square => "resize(square)".to_string(),
                ResizeMode::Vertical { width, height } => {
                    format!("resize(vertical {width}x{height})")
                }
                ResizeMode::ScaleCrop { factor } => format!("resize(scale {factor} + crop)"),
            },
            Stage::ColorAdjust {
                multiplier,
                luminance_delta,
                contrast_delta,
            } => format!(
                "color(x{multiplier}, lum{luminance_delta:+}, contrast{contrast_delta:+})"
            ),
            Stage::SpeedAdjust { factor } => format!("speed(x{factor})"),
            Stage::Composite {
                overlay,
                anchor,
                offset_secs,
                duration_secs,
                mode,
            } => format!(
                "composite({overlay:?}, {anchor:?}+{offset_secs}s, {duration_secs}s, {mode:?})"
            )
            .to_lowercase(),
            Stage::PixelFilter { kind } => format!("filter({kind:?})").to_lowercase(),
        }
    }

    fn validate(&self) -> SpinoffResult<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SpinoffError::invalid_profile(format!(
                    "{}: {name} must be positive, got {v}",
                    self.label()
                )))
            }
        };
        let finite = |name: &str, v: f64| {
            if v.is_finite() {
                Ok(())
            } else {
                Err(SpinoffError::invalid_profile(format!(
                    "{}: {name} must be finite",
                    self.label()
                )))
            }
        };

        match *self {
            Stage::Trim { max_secs } => positive("max_secs", max_secs),
            Stage::Resize { mode } => match mode {
                ResizeMode::Fit { width, height } | ResizeMode::Vertical { width, height } => {
                    positive("width", width as f64)?;
                    positive("height", height as f64)
                }
                ResizeMode::Square => Ok(()),
                ResizeMode::ScaleCrop { factor } => positive("factor", factor),
            },
            Stage::ColorAdjust {
                multiplier,
                luminance_delta,
                contrast_delta,
            } => {
                positive("multiplier", multiplier)?;
                finite("luminance_delta", luminance_delta)?;
                finite("contrast_delta", contrast_delta)
            }
            Stage::SpeedAdjust { factor } => positive("factor", factor),
            Stage::Composite {
                offset_secs,
                duration_secs,
                ..
            } => {
                finite("offset_secs", offset_secs)?;
                if offset_secs < 0.0 {
                    return Err(SpinoffError::invalid_profile(format!(
                        "{}: offset_secs must not be negative",
                        self.label()
                    )));
                }
                positive("duration_secs", duration_secs)
            }
            Stage::PixelFilter { .. } => Ok(()),
        }
    }
}

/// Encoder speed/quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodePreset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
}

impl EncodePreset {
    pub fn as_str(self) -> &'static str {
        match self {
            EncodePreset::Ultrafast => "ultrafast",
            EncodePreset::Superfast => "superfast",
            EncodePreset::Veryfast => "veryfast",
            EncodePreset::Faster => "faster",
            EncodePreset::Fast => "fast",
            EncodePreset::Medium => "medium",
            EncodePreset::Slow => "slow",
            EncodePreset::Slower => "slower",
            EncodePreset::Veryslow => "veryslow",
        }
    }
}

/// Codec and rate-control parameters for the output container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// ffmpeg video encoder name.
    pub video_codec: String,
    /// ffmpeg audio encoder name.
    pub audio_codec: String,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub preset: EncodePreset,
    /// Encoder threads. 0 lets the caller pick from its configuration.
    pub threads: usize,
    pub pixel_format: String,
}

impl EncodeSettings {
    /// H.264 video and AAC audio in yuv420p, the broadly compatible default.
    pub fn h264_aac(video_bitrate_kbps: u32, audio_bitrate_kbps: u32, preset: EncodePreset) -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            video_bitrate_kbps,
            audio_bitrate_kbps,
            preset,
            threads: 0,
            pixel_format: "yuv420p".to_string(),
        }
    }

    /// Video bitrate as an ffmpeg argument, e.g. `"2000k"`.
    pub fn bitrate_arg(&self) -> String {
        format!("{}k", self.video_bitrate_kbps)
    }

    /// Audio bitrate as an ffmpeg argument, e.g. `"128k"`.
    pub fn audio_bitrate_arg(&self) -> String {
        format!("{}k", self.audio_bitrate_kbps)
    }

    /// Copy with the thread count resolved against `max_threads`.
    pub fn with_threads(&self, max_threads: usize) -> Self {
        let max_threads = max_threads.max(1);
        let threads = if self.threads == 0 {
            max_threads
        } else {
            self.threads.min(max_threads)
        };
        Self {
            threads,
            ..self.clone()
        }
    }
}

/// The geometry a profile promises for its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetGeometry {
    /// Exactly this size.
    Exact { width: u32, height: u32 },
    /// 1:1, side derived from the source.
    Square,
}

/// Immutable per-platform recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub platform: Platform,
    /// Applied left to right; the order is part of the recipe.
    pub stages: Vec<Stage>,
    /// Maximum output duration, if the platform has one.
    pub duration_cap_secs: Option<f64>,
    pub target: TargetGeometry,
    pub encode: EncodeSettings,
}

impl Profile {
    /// Check the recipe is usable: stages present, parameters in range,
    /// non-zero bitrates.
    pub fn validate(&self) -> SpinoffResult<()> {
        if self.stages.is_empty() {
            return Err(SpinoffError::invalid_profile(format!(
                "{}: stage list is empty",
                self.platform
            )));
        }
        for stage in &self.stages {
            stage.validate()?;
        }
        if let Some(cap) = self.duration_cap_secs {
            if !(cap.is_finite() && cap > 0.0) {
                return Err(SpinoffError::invalid_profile(format!(
                    "{}: duration cap must be positive",
                    self.platform
                )));
            }
        }
        if self.encode.video_bitrate_kbps == 0 || self.encode.audio_bitrate_kbps == 0 {
            return Err(SpinoffError::invalid_profile(format!(
                "{}: bitrates must be non-zero",
                self.platform
            )));
        }
        Ok(())
    }
}
