//! Frame geometry: pixel dimensions and crop rectangles.
//!
//! Unlike the normalized coordinates used for framing decisions, everything
//! here is in whole output pixels.

use serde::{Deserialize, Serialize};

/// Width and height of a frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square dimensions with the given side.
    pub const fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// Whether either side is zero.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Longer side.
    pub fn long_side(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Shorter side.
    pub fn short_side(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Both sides multiplied by `factor`, rounded to whole pixels.
    pub fn scaled(&self, factor: f64) -> Dimensions {
        Dimensions {
            width: (self.width as f64 * factor).round() as u32,
            height: (self.height as f64 * factor).round() as u32,
        }
    }

    /// Whether `other` fits inside these dimensions.
    pub fn contains(&self, other: &Dimensions) -> bool {
        other.width <= self.width && other.height <= self.height
    }

    /// Number of bytes in a packed RGB24 frame of this size.
    pub fn rgb_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A pixel-aligned crop window inside a larger frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// A `target`-sized window centered inside `source`.
    ///
    /// Returns `None` when the window does not fit, or is empty.
    pub fn centered(source: Dimensions, target: Dimensions) -> Option<Self> {
        if target.is_degenerate() || !source.contains(&target) {
            return None;
        }
        Some(Self {
            x: (source.width - target.width) / 2,
            y: (source.height - target.height) / 2,
            width: target.width,
            height: target.height,
        })
    }

    /// A window of `1 / zoom` of the source, centered.
    ///
    /// `zoom` below 1.0 is treated as 1.0 (full frame).
    pub fn zoomed(source: Dimensions, zoom: f64) -> Self {
        let zoom = if zoom.is_finite() { zoom.max(1.0) } else { 1.0 };
        let width = ((source.width as f64 / zoom).round() as u32).clamp(1, source.width.max(1));
        let height = ((source.height as f64 / zoom).round() as u32).clamp(1, source.height.max(1));
        Self {
            x: (source.width.saturating_sub(width)) / 2,
            y: (source.height.saturating_sub(height)) / 2,
            width,
            height,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Check if a pixel lies within the window.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}
