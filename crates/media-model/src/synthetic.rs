//! Generated frame sources.
//!
//! Used by tests and by `spinoff check` to exercise the pipeline and the
//! encoder without any decoder in the loop.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use spinoff_common::error::SpinoffResult;

use crate::asset::{Frame, FrameIter, FrameSource, VideoAsset};
use crate::geometry::Dimensions;

/// What each generated frame looks like.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pattern {
    /// Every pixel has the same color.
    Solid([u8; 3]),
    /// Horizontal ramp from black (left) to white (right).
    Gradient,
    /// Uniform frame whose red/green channels encode the frame index
    /// (`index % 256`, `(index / 256) % 256`); blue is fixed at 128.
    Counter,
}

impl Pattern {
    fn render(&self, dims: Dimensions, index: u64) -> RgbImage {
        match *self {
            Pattern::Solid(rgb) => RgbImage::from_pixel(dims.width, dims.height, Rgb(rgb)),
            Pattern::Gradient => {
                let span = dims.width.saturating_sub(1).max(1) as f64;
                RgbImage::from_fn(dims.width, dims.height, |x, _| {
                    let v = ((x as f64 / span) * 255.0).round() as u8;
                    Rgb([v, v, v])
                })
            }
            Pattern::Counter => {
                let r = (index % 256) as u8;
                let g = ((index / 256) % 256) as u8;
                RgbImage::from_pixel(dims.width, dims.height, Rgb([r, g, 128]))
            }
        }
    }
}

/// Decode `[r, g]` of a [`Pattern::Counter`] pixel back to a frame index.
pub fn counter_index(pixel: &Rgb<u8>) -> u64 {
    pixel.0[0] as u64 + pixel.0[1] as u64 * 256
}

/// A fixed number of generated frames.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    dimensions: Dimensions,
    frame_count: u64,
    pattern: Pattern,
}

impl SyntheticSource {
    pub fn new(dimensions: Dimensions, frame_count: u64, pattern: Pattern) -> Self {
        Self {
            dimensions,
            frame_count,
            pattern,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn open(&self) -> SpinoffResult<FrameIter<'_>> {
        Ok(Box::new((0..self.frame_count).map(move |index| {
            Ok(Frame::new(index, self.pattern.render(self.dimensions, index)))
        })))
    }
}

/// A silent generated asset with `round(duration * fps)` frames.
pub fn synthetic_asset(
    label: &str,
    dimensions: Dimensions,
    duration_secs: f64,
    frame_rate: f64,
    pattern: Pattern,
) -> SpinoffResult<VideoAsset> {
    let count = spinoff_common::timing::frame_count(duration_secs, frame_rate);
    VideoAsset::new(
        label,
        dimensions,
        duration_secs,
        frame_rate,
        None,
        Arc::new(SyntheticSource::new(dimensions, count, pattern)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_pattern_encodes_index() {
        let src = SyntheticSource::new(Dimensions::new(2, 2), 300, Pattern::Counter);
        let frames: Vec<Frame> = src.open().unwrap().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 300);
        assert_eq!(counter_index(frames[299].image.get_pixel(1, 1)), 299);
    }

    #[test]
    fn test_gradient_spans_full_range() {
        let src = SyntheticSource::new(Dimensions::new(5, 1), 1, Pattern::Gradient);
        let frame = src.open().unwrap().next().unwrap().unwrap();
        assert_eq!(frame.image.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(frame.image.get_pixel(4, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_synthetic_asset_frame_count() {
        let asset =
            synthetic_asset("synthetic", Dimensions::new(8, 8), 2.0, 15.0, Pattern::Gradient)
                .unwrap();
        assert!(!asset.has_audio());
        assert_eq!(asset.open_frames().unwrap().count(), 30);
    }
}
