//! Per-pixel image operators.
//!
//! All operators are stateless and work on one frame at a time; rows are
//! processed in parallel with rayon. Channel intensities are treated as
//! normalized `[0, 1]` values stored as `u8`.

use image::RgbImage;
use rayon::prelude::*;
use spinoff_media_model::geometry::Dimensions;

/// Mid-gray pivot for contrast adjustments.
const MID_GRAY: f64 = 0.5;

/// A 256-entry per-channel lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLut([u8; 256]);

impl ChannelLut {
    pub fn identity() -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self(table)
    }

    fn from_fn(f: impl Fn(f64) -> f64) -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            let out = f(i as f64 / 255.0).clamp(0.0, 1.0);
            *v = (out * 255.0).round() as u8;
        }
        Self(table)
    }

    /// Multiply every channel by `multiplier`, clamping at white.
    pub fn scale(multiplier: f64) -> Self {
        Self::from_fn(|v| v * multiplier)
    }

    /// Add `lum_delta`, then stretch the deviation from mid-gray by
    /// `1 + contrast_delta`.
    pub fn lum_contrast(lum_delta: f64, contrast_delta: f64) -> Self {
        Self::from_fn(|v| MID_GRAY + (v + lum_delta - MID_GRAY) * (1.0 + contrast_delta))
    }

    /// This table followed by `next`.
    pub fn then(&self, next: &ChannelLut) -> Self {
        let mut table = [0u8; 256];
        for (i, v) in table.iter_mut().enumerate() {
            *v = next.0[self.0[i] as usize];
        }
        Self(table)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn lookup(&self, value: u8) -> u8 {
        self.0[value as usize]
    }

    /// Apply to every channel of every pixel.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let mut out = image.clone();
        let row_len = (image.width() as usize * 3).max(1);
        let buf: &mut [u8] = &mut out;
        buf.par_chunks_mut(row_len).for_each(|row| {
            for v in row.iter_mut() {
                *v = self.0[*v as usize];
            }
        });
        out
    }
}

/// Multiply channel values by `multiplier`, clamping to the valid range.
pub fn color_scale(image: &RgbImage, multiplier: f64) -> RgbImage {
    ChannelLut::scale(multiplier).apply(image)
}

/// Shift luminance by `lum_delta` and scale contrast around mid-gray by
/// `1 + contrast_delta`, clamping to the valid range.
pub fn lum_contrast(image: &RgbImage, lum_delta: f64, contrast_delta: f64) -> RgbImage {
    ChannelLut::lum_contrast(lum_delta, contrast_delta).apply(image)
}

/// Precomputed radial falloff for one frame size.
///
/// The weight of pixel `(x, y)` is `1 - d / d_max`, where `d` is its
/// distance from the frame center and `d_max` the center-to-corner distance.
#[derive(Debug, Clone)]
pub struct VignetteMask {
    dimensions: Dimensions,
    weights: Vec<f32>,
}

impl VignetteMask {
    pub fn new(dimensions: Dimensions) -> Self {
        let w = dimensions.width as usize;
        let h = dimensions.height as usize;
        let cx = (dimensions.width as f64 - 1.0) / 2.0;
        let cy = (dimensions.height as f64 - 1.0) / 2.0;
        let max_dist = (cx * cx + cy * cy).sqrt();

        let mut weights = vec![1.0f32; w * h];
        if max_dist > 0.0 {
            weights
                .par_chunks_mut(w.max(1))
                .enumerate()
                .for_each(|(y, row)| {
                    let dy = y as f64 - cy;
                    for (x, weight) in row.iter_mut().enumerate() {
                        let dx = x as f64 - cx;
                        let normalized = (dx * dx + dy * dy).sqrt() / max_dist;
                        *weight = (1.0 - normalized).clamp(0.0, 1.0) as f32;
                    }
                });
        }

        Self {
            dimensions,
            weights,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Intensity multiplier at `(x, y)`.
    pub fn weight(&self, x: u32, y: u32) -> f64 {
        self.weights[y as usize * self.dimensions.width as usize + x as usize] as f64
    }

    /// Darken `image` by the mask. Falls back to a fresh mask when the
    /// frame size does not match.
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let dims = Dimensions::new(image.width(), image.height());
        if dims != self.dimensions {
            return VignetteMask::new(dims).apply(image);
        }

        let mut out = image.clone();
        let width = dims.width as usize;
        let buf: &mut [u8] = &mut out;
        buf.par_chunks_mut((width * 3).max(1))
            .zip(self.weights.par_chunks(width.max(1)))
            .for_each(|(row, weights)| {
                for (px, weight) in row.chunks_exact_mut(3).zip(weights) {
                    for v in px.iter_mut() {
                        *v = (*v as f32 * weight).round() as u8;
                    }
                }
            });
        out
    }
}

/// Radial darkening, strongest at the corners and absent at the center.
pub fn vignette(image: &RgbImage) -> RgbImage {
    VignetteMask::new(Dimensions::new(image.width(), image.height())).apply(image)
}

/// Mean of all channel values, for coarse brightness comparisons.
pub fn mean_intensity(image: &RgbImage) -> f64 {
    let raw = image.as_raw();
    if raw.is_empty() {
        return 0.0;
    }
    raw.iter().map(|&v| v as u64).sum::<u64>() as f64 / raw.len() as f64
}
