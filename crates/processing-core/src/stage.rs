//! Applying a single [`Stage`] to an asset.

use std::sync::Arc;

use spinoff_common::error::SpinoffResult;
use spinoff_common::timing;
use spinoff_media_model::asset::{AudioOp, Frame, VideoAsset};
use spinoff_media_model::profile::{PixelFilterKind, ResizeMode, Stage};

use crate::composite::{apply_composite, CompositeSpec};
use crate::frames::{MappedFrames, RetimedFrames, TrimmedFrames};
use crate::geometry;
use crate::pixel::{ChannelLut, VignetteMask};

/// A pure asset-to-asset transformation.
///
/// Implementations never mutate the input; on success they return a new
/// asset, on failure the input is still valid.
pub trait Transform {
    fn apply(&self, asset: &VideoAsset) -> SpinoffResult<VideoAsset>;
}

impl Transform for Stage {
    fn apply(&self, asset: &VideoAsset) -> SpinoffResult<VideoAsset> {
        let label = self.label();
        match *self {
            Stage::Trim { max_secs } => trim(asset, max_secs, &label),
            Stage::Resize { mode } => match mode {
                ResizeMode::Fit { width, height } => {
                    geometry::resize_fit(asset, width, height, &label)
                }
                ResizeMode::Square => geometry::resize_square(asset, &label),
                ResizeMode::Vertical { width, height } => {
                    geometry::resize_vertical(asset, width, height, &label)
                }
                ResizeMode::ScaleCrop { factor } => geometry::scale_crop(asset, factor, &label),
            },
            Stage::ColorAdjust {
                multiplier,
                luminance_delta,
                contrast_delta,
            } => color_adjust(asset, multiplier, luminance_delta, contrast_delta, &label),
            Stage::SpeedAdjust { factor } => speed_adjust(asset, factor, &label),
            Stage::Composite {
                overlay,
                anchor,
                offset_secs,
                duration_secs,
                mode,
            } => {
                let spec = CompositeSpec {
                    overlay,
                    anchor,
                    offset_secs,
                    duration_secs,
                    mode,
                };
                apply_composite(asset, &spec, &label)
            }
            Stage::PixelFilter { kind } => pixel_filter(asset, kind, &label),
        }
    }
}

/// Cut the asset at `max_secs`. Shorter assets pass through unchanged.
pub fn trim(asset: &VideoAsset, max_secs: f64, stage: &str) -> SpinoffResult<VideoAsset> {
    if asset.duration_secs() <= max_secs {
        return Ok(asset.clone());
    }
    let limit = timing::frame_count(max_secs, asset.frame_rate());
    asset
        .derive(stage)
        .duration(max_secs)
        .frames(Arc::new(TrimmedFrames::new(asset.frames(), limit)))
        .audio_op(AudioOp::Trim { end_secs: max_secs })
        .build()
}

/// Channel multiplier, then luminance shift and contrast, as one table.
pub fn color_adjust(
    asset: &VideoAsset,
    multiplier: f64,
    luminance_delta: f64,
    contrast_delta: f64,
    stage: &str,
) -> SpinoffResult<VideoAsset> {
    let lut = ChannelLut::scale(multiplier)
        .then(&ChannelLut::lum_contrast(luminance_delta, contrast_delta));
    if lut.is_identity() {
        return asset.derive(stage).build();
    }
    let frames = MappedFrames::new(
        asset.frames(),
        stage,
        Arc::new(move |frame: Frame| {
            let image = lut.apply(&frame.image);
            frame.with_image(image)
        }),
    );
    asset.derive(stage).frames(Arc::new(frames)).build()
}

/// Play back `factor` times faster. Duration becomes `duration / factor`.
pub fn speed_adjust(asset: &VideoAsset, factor: f64, stage: &str) -> SpinoffResult<VideoAsset> {
    if factor == 1.0 {
        return Ok(asset.clone());
    }
    let duration = asset.duration_secs() / factor;
    let count = timing::frame_count(duration, asset.frame_rate());
    asset
        .derive(stage)
        .duration(duration)
        .frames(Arc::new(RetimedFrames::new(asset.frames(), factor, count)))
        .audio_op(AudioOp::Tempo { factor })
        .build()
}

pub fn pixel_filter(
    asset: &VideoAsset,
    kind: PixelFilterKind,
    stage: &str,
) -> SpinoffResult<VideoAsset> {
    match kind {
        PixelFilterKind::Vignette => {
            let mask = Arc::new(VignetteMask::new(asset.dimensions()));
            let frames = MappedFrames::new(
                asset.frames(),
                stage,
                Arc::new(move |frame: Frame| {
                    let image = mask.apply(&frame.image);
                    frame.with_image(image)
                }),
            );
            asset.derive(stage).frames(Arc::new(frames)).build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinoff_media_model::asset::AudioTrack;
    use spinoff_media_model::geometry::Dimensions;
    use spinoff_media_model::synthetic::{counter_index, Pattern, SyntheticSource};

    fn with_audio(duration: f64, fps: f64, pattern: Pattern) -> VideoAsset {
        let dims = Dimensions::new(8, 8);
        let count = timing::frame_count(duration, fps);
        VideoAsset::new(
            "clip.mp4",
            dims,
            duration,
            fps,
            Some(AudioTrack::from_source("clip.mp4")),
            Arc::new(SyntheticSource::new(dims, count, pattern)),
        )
        .unwrap()
    }

    #[test]
    fn test_trim_caps_duration_and_frames() {
        let asset = with_audio(10.0, 5.0, Pattern::Counter);
        let out = Stage::trim(4.0).apply(&asset).unwrap();
        assert_eq!(out.duration_secs(), 4.0);
        assert_eq!(out.open_frames().unwrap().count(), 20);
        assert_eq!(
            out.audio().unwrap().ops,
            vec![AudioOp::Trim { end_secs: 4.0 }]
        );
    }

    #[test]
    fn test_trim_short_asset_is_untouched() {
        let asset = with_audio(3.0, 5.0, Pattern::Counter);
        let out = Stage::trim(4.0).apply(&asset).unwrap();
        assert_eq!(out.duration_secs(), 3.0);
        assert!(out.audio().unwrap().ops.is_empty());
        assert!(out.history().is_empty());
    }

    #[test]
    fn test_speed_shortens_and_retimes() {
        let asset = with_audio(11.0, 10.0, Pattern::Counter);
        let out = Stage::speed(1.1).apply(&asset).unwrap();
        assert!((out.duration_secs() - 10.0).abs() < 1e-9);
        let idx: Vec<u64> = out
            .open_frames()
            .unwrap()
            .map(|f| counter_index(f.unwrap().image.get_pixel(0, 0)))
            .collect();
        assert_eq!(idx.len(), 100);
        assert_eq!(idx[10], 11);
        assert_eq!(
            out.audio().unwrap().ops,
            vec![AudioOp::Tempo { factor: 1.1 }]
        );
    }

    #[test]
    fn test_speed_one_is_noop() {
        let asset = with_audio(2.0, 10.0, Pattern::Counter);
        let out = Stage::speed(1.0).apply(&asset).unwrap();
        assert_eq!(out.duration_secs(), 2.0);
        assert!(out.audio().unwrap().ops.is_empty());
    }

    #[test]
    fn test_color_adjust_scales_then_shifts() {
        let asset = with_audio(1.0, 2.0, Pattern::Solid([100, 100, 100]));
        let out = Stage::color(1.2, 0.0, 0.0).apply(&asset).unwrap();
        let frame = out.open_frames().unwrap().next().unwrap().unwrap();
        assert_eq!(frame.image.get_pixel(3, 3).0, [120, 120, 120]);
        assert_eq!(out.history(), ["color(x1.2, lum+0, contrast+0)"]);
    }

    #[test]
    fn test_identity_color_keeps_frames() {
        let asset = with_audio(1.0, 2.0, Pattern::Solid([77, 0, 255]));
        let out = Stage::color(1.0, 0.0, 0.0).apply(&asset).unwrap();
        let frame = out.open_frames().unwrap().next().unwrap().unwrap();
        assert_eq!(frame.image.get_pixel(0, 0).0, [77, 0, 255]);
    }

    #[test]
    fn test_vignette_darkens_corners() {
        let asset = with_audio(1.0, 2.0, Pattern::Solid([200, 200, 200]));
        let out = Stage::filter(PixelFilterKind::Vignette)
            .apply(&asset)
            .unwrap();
        let frame = out.open_frames().unwrap().next().unwrap().unwrap();
        assert!(frame.image.get_pixel(0, 0).0[0] < frame.image.get_pixel(4, 4).0[0]);
    }

    #[test]
    fn test_resize_dispatch() {
        let asset = with_audio(1.0, 2.0, Pattern::Gradient);
        let out = Stage::resize(ResizeMode::Fit {
            width: 4,
            height: 2,
        })
        .apply(&asset)
        .unwrap();
        assert_eq!(out.dimensions(), Dimensions::new(4, 2));
        assert_eq!(asset.dimensions(), Dimensions::new(8, 8));
    }
}
