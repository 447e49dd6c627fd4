//! Video assets and their lazily produced frame streams.
//!
//! A [`VideoAsset`] is an immutable handle: geometry and timing metadata, an
//! optional audio track description, and a re-openable [`FrameSource`].
//! Transformations never touch an existing asset; they derive a new one
//! whose frame source wraps the old one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_common::timing;

use crate::geometry::Dimensions;

/// One decoded RGB frame.
#[derive(Clone)]
pub struct Frame {
    /// Zero-based position in the stream it was produced by.
    pub index: u64,
    /// Packed 8-bit RGB pixels.
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    /// Replace the pixels, keeping the index.
    pub fn with_image(self, image: RgbImage) -> Self {
        Self {
            index: self.index,
            image,
        }
    }

    /// Renumber the frame.
    pub fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Iterator over the frames of one pass through a source.
pub type FrameIter<'a> = Box<dyn Iterator<Item = SpinoffResult<Frame>> + Send + 'a>;

/// A re-openable, lazily evaluated stream of frames.
///
/// Each call to [`FrameSource::open`] starts a fresh pass from the first
/// frame, so any intermediate asset can be inspected on its own.
pub trait FrameSource: Send + Sync + fmt::Debug {
    fn open(&self) -> SpinoffResult<FrameIter<'_>>;
}

/// An audio edit, applied in order to the source's first audio stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AudioOp {
    /// Keep only `[0, end_secs)`.
    Trim { end_secs: f64 },
    /// Play back `factor` times faster, preserving pitch.
    Tempo { factor: f64 },
    /// Append silence.
    PadSilence { secs: f64 },
    /// Prepend silence.
    Delay { secs: f64 },
}

/// Where the audio comes from and what has been done to it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Media file holding the original audio stream.
    pub source: PathBuf,
    /// Edits in application order.
    pub ops: Vec<AudioOp>,
}

impl AudioTrack {
    pub fn from_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ops: Vec::new(),
        }
    }
}

/// Immutable handle to one video plus its geometry and timing.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    source_path: PathBuf,
    dimensions: Dimensions,
    duration_secs: f64,
    frame_rate: f64,
    audio: Option<AudioTrack>,
    frames: Arc<dyn FrameSource>,
    history: Vec<String>,
}

impl VideoAsset {
    /// Create an asset straight from a source.
    ///
    /// Fails with `DegenerateGeometry` when the dimensions are zero or the
    /// duration or frame rate is not a positive finite number.
    pub fn new(
        source_path: impl Into<PathBuf>,
        dimensions: Dimensions,
        duration_secs: f64,
        frame_rate: f64,
        audio: Option<AudioTrack>,
        frames: Arc<dyn FrameSource>,
    ) -> SpinoffResult<Self> {
        let asset = Self {
            source_path: source_path.into(),
            dimensions,
            duration_secs,
            frame_rate,
            audio,
            frames,
            history: Vec::new(),
        };
        asset.validate("load")?;
        Ok(asset)
    }

    fn validate(&self, stage: &str) -> SpinoffResult<()> {
        if self.dimensions.is_degenerate() {
            return Err(SpinoffError::degenerate(
                stage,
                format!("dimensions {} have a zero side", self.dimensions),
            ));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(SpinoffError::degenerate(
                stage,
                format!("duration {} is not positive", self.duration_secs),
            ));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(SpinoffError::degenerate(
                stage,
                format!("frame rate {} is not positive", self.frame_rate),
            ));
        }
        Ok(())
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Frames the encoder will pull: `round(duration * fps)`, at least one.
    pub fn frame_count(&self) -> u64 {
        timing::frame_count(self.duration_secs, self.frame_rate)
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    /// The underlying frame source, for wrapping by a transformation.
    pub fn frames(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.frames)
    }

    /// Start a fresh pass over the frames.
    pub fn open_frames(&self) -> SpinoffResult<FrameIter<'_>> {
        self.frames.open()
    }

    /// Labels of the transformations that produced this asset, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Begin deriving a new asset from this one.
    pub fn derive(&self, stage: impl Into<String>) -> AssetBuilder {
        AssetBuilder {
            asset: self.clone(),
            stage: stage.into(),
        }
    }
}

/// Builder for an asset derived from an existing one.
///
/// Everything not explicitly replaced is carried over from the parent.
#[derive(Debug)]
pub struct AssetBuilder {
    asset: VideoAsset,
    stage: String,
}

impl AssetBuilder {
    pub fn dimensions(mut self, dimensions: Dimensions) -> Self {
        self.asset.dimensions = dimensions;
        self
    }

    pub fn duration(mut self, duration_secs: f64) -> Self {
        self.asset.duration_secs = duration_secs;
        self
    }

    pub fn frames(mut self, frames: Arc<dyn FrameSource>) -> Self {
        self.asset.frames = frames;
        self
    }

    /// Record an audio edit. No-op when the asset has no audio.
    pub fn audio_op(mut self, op: AudioOp) -> Self {
        if let Some(audio) = self.asset.audio.as_mut() {
            audio.ops.push(op);
        }
        self
    }

    /// Validate and finish. The stage label is appended to the history.
    pub fn build(mut self) -> SpinoffResult<VideoAsset> {
        self.asset.validate(&self.stage)?;
        self.asset.history.push(self.stage);
        Ok(self.asset)
    }
}
