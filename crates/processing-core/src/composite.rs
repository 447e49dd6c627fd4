//! Composite stages: end screens and zoomed intros.
//!
//! A composite only fires when the asset is longer than its window
//! (`offset + duration`); shorter assets pass through untouched.
//!
//! In [`CompositeMode::Overlay`] the effect is drawn on top of the frames in
//! the window and the duration does not change. In
//! [`CompositeMode::Append`] a new segment is spliced onto the anchored end
//! and the duration grows by the window length; the offset then only
//! affects whether the stage fires.

use std::sync::Arc;

use image::{Rgb, RgbImage};
use spinoff_common::error::SpinoffResult;
use spinoff_common::timing;
use spinoff_media_model::asset::{AudioOp, Frame, VideoAsset};
use spinoff_media_model::geometry::{CropRect, Dimensions};
use spinoff_media_model::profile::{Anchor, CompositeMode, OverlayKind};

use crate::frames::{AppendedFrames, FrameFn, PrependedFrames, WindowedFrames};
use crate::geometry::zoom_frame;
use crate::pixel::ChannelLut;

/// Brightness kept behind the end card.
pub const END_SCREEN_DIM: f64 = 0.35;

/// End card fill color.
pub const END_CARD_COLOR: [u8; 3] = [240, 240, 240];

/// Center zoom applied during the intro.
pub const INTRO_ZOOM: f64 = 1.2;

/// Dim the frame and draw a centered card covering half the width and a
/// quarter of the height.
pub fn end_screen_frame(image: &RgbImage) -> RgbImage {
    let mut out = ChannelLut::scale(END_SCREEN_DIM).apply(image);
    let dims = Dimensions::new(image.width(), image.height());
    let card = Dimensions::new(dims.width / 2, dims.height / 4);
    if let Some(rect) = CropRect::centered(dims, card) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                out.put_pixel(x, y, Rgb(END_CARD_COLOR));
            }
        }
    }
    out
}

/// Center zoom by [`INTRO_ZOOM`].
pub fn zoomed_intro_frame(image: &RgbImage) -> RgbImage {
    zoom_frame(image, INTRO_ZOOM)
}

fn overlay_fn(overlay: OverlayKind) -> FrameFn {
    match overlay {
        OverlayKind::EndScreen => Arc::new(|frame: Frame| {
            let image = end_screen_frame(&frame.image);
            frame.with_image(image)
        }),
        OverlayKind::ZoomedIntro => Arc::new(|frame: Frame| {
            let image = zoomed_intro_frame(&frame.image);
            frame.with_image(image)
        }),
    }
}

/// Parameters of one composite stage.
#[derive(Debug, Clone, Copy)]
pub struct CompositeSpec {
    pub overlay: OverlayKind,
    pub anchor: Anchor,
    pub offset_secs: f64,
    pub duration_secs: f64,
    pub mode: CompositeMode,
}

impl CompositeSpec {
    /// Whether the stage applies to an asset of `duration_secs`.
    pub fn fires_for(&self, duration_secs: f64) -> bool {
        duration_secs > self.offset_secs + self.duration_secs
    }

    /// Frame range `[start, end)` covered by the window in an asset of
    /// `total` frames at `fps`.
    pub fn window_frames(&self, asset_duration: f64, fps: f64, total: u64) -> (u64, u64) {
        let (start_secs, end_secs) = match self.anchor {
            Anchor::Start => (self.offset_secs, self.offset_secs + self.duration_secs),
            Anchor::End => {
                let end = asset_duration - self.offset_secs;
                (end - self.duration_secs, end)
            }
        };
        let to_frame = |secs: f64| ((secs.max(0.0) * fps).round() as u64).min(total);
        (to_frame(start_secs), to_frame(end_secs))
    }
}

/// Apply a composite stage, or return the asset unchanged when it does
/// not fire.
pub fn apply_composite(
    asset: &VideoAsset,
    spec: &CompositeSpec,
    stage: &str,
) -> SpinoffResult<VideoAsset> {
    if !spec.fires_for(asset.duration_secs()) {
        tracing::debug!(
            stage,
            duration_secs = asset.duration_secs(),
            "Composite window not reached, skipping"
        );
        return Ok(asset.clone());
    }

    let op = overlay_fn(spec.overlay);
    let fps = asset.frame_rate();

    match spec.mode {
        CompositeMode::Overlay => {
            let (start, end) =
                spec.window_frames(asset.duration_secs(), fps, asset.frame_count());
            let frames = WindowedFrames::new(asset.frames(), start, end, stage, op);
            asset.derive(stage).frames(Arc::new(frames)).build()
        }
        CompositeMode::Append => {
            let added = timing::frame_count(spec.duration_secs, fps);
            let duration = asset.duration_secs() + spec.duration_secs;
            match spec.anchor {
                Anchor::End => {
                    let frames = AppendedFrames::new(asset.frames(), added, stage, op);
                    asset
                        .derive(stage)
                        .duration(duration)
                        .frames(Arc::new(frames))
                        .audio_op(AudioOp::PadSilence {
                            secs: spec.duration_secs,
                        })
                        .build()
                }
                Anchor::Start => {
                    let frames = PrependedFrames::new(asset.frames(), added, stage, op);
                    asset
                        .derive(stage)
                        .duration(duration)
                        .frames(Arc::new(frames))
                        .audio_op(AudioOp::Delay {
                            secs: spec.duration_secs,
                        })
                        .build()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::mean_intensity;
    use spinoff_media_model::synthetic::{synthetic_asset, Pattern};

    fn spec(overlay: OverlayKind, anchor: Anchor, secs: f64, mode: CompositeMode) -> CompositeSpec {
        CompositeSpec {
            overlay,
            anchor,
            offset_secs: 0.0,
            duration_secs: secs,
            mode,
        }
    }

    fn asset(duration: f64) -> VideoAsset {
        synthetic_asset(
            "t",
            Dimensions::new(16, 16),
            duration,
            2.0,
            Pattern::Solid([100, 100, 100]),
        )
        .unwrap()
    }

    #[test]
    fn test_end_screen_frame_dims_and_draws_card() {
        let img = RgbImage::from_pixel(40, 40, Rgb([200, 200, 200]));
        let out = end_screen_frame(&img);
        assert_eq!(out.get_pixel(0, 0).0, [70, 70, 70]);
        assert_eq!(out.get_pixel(20, 20).0, END_CARD_COLOR);
    }

    #[test]
    fn test_does_not_fire_at_exact_window() {
        let s = spec(OverlayKind::EndScreen, Anchor::End, 20.0, CompositeMode::Overlay);
        assert!(!s.fires_for(20.0));
        assert!(s.fires_for(20.5));

        let a = asset(3.0);
        let out = apply_composite(
            &a,
            &spec(OverlayKind::ZoomedIntro, Anchor::Start, 3.0, CompositeMode::Overlay),
            "intro",
        )
        .unwrap();
        assert!(out.history().is_empty());
        assert_eq!(out.duration_secs(), 3.0);
    }

    #[test]
    fn test_end_window_frames() {
        let s = spec(OverlayKind::EndScreen, Anchor::End, 20.0, CompositeMode::Overlay);
        assert_eq!(s.window_frames(30.0, 30.0, 900), (300, 900));

        let s = spec(OverlayKind::ZoomedIntro, Anchor::Start, 3.0, CompositeMode::Overlay);
        assert_eq!(s.window_frames(10.0, 30.0, 300), (0, 90));
    }

    #[test]
    fn test_overlay_keeps_duration_and_marks_tail() {
        let a = asset(10.0);
        let s = spec(OverlayKind::EndScreen, Anchor::End, 4.0, CompositeMode::Overlay);
        let out = apply_composite(&a, &s, "end").unwrap();
        assert_eq!(out.duration_secs(), 10.0);

        let means: Vec<f64> = out
            .open_frames()
            .unwrap()
            .map(|f| mean_intensity(&f.unwrap().image))
            .collect();
        assert_eq!(means.len(), 20);
        assert!(means[..12].iter().all(|m| (*m - 100.0).abs() < 1e-9));
        assert!(means[12..].iter().all(|m| (*m - 100.0).abs() > 1.0));
    }

    #[test]
    fn test_append_end_extends_duration() {
        let a = asset(10.0);
        let s = spec(OverlayKind::EndScreen, Anchor::End, 4.0, CompositeMode::Append);
        let out = apply_composite(&a, &s, "end").unwrap();
        assert_eq!(out.duration_secs(), 14.0);
        assert_eq!(out.open_frames().unwrap().count() as u64, out.frame_count());
    }

    #[test]
    fn test_append_start_prepends_intro() {
        let a = asset(10.0);
        let s = spec(OverlayKind::ZoomedIntro, Anchor::Start, 3.0, CompositeMode::Append);
        let out = apply_composite(&a, &s, "intro").unwrap();
        assert_eq!(out.duration_secs(), 13.0);
        assert_eq!(out.open_frames().unwrap().count(), 26);
    }
}
