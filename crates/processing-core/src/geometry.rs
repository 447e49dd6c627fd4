//! Aspect-ratio policies: fit, square, vertical, and scale-then-crop.
//!
//! Frame-level helpers do the resampling; asset-level operations check the
//! geometry up front and return a new asset whose frames are resized lazily.
//! A resize that would produce an empty frame, or a crop larger than its
//! source, fails with `DegenerateGeometry` instead of clamping.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbImage;
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_media_model::asset::{Frame, VideoAsset};
use spinoff_media_model::geometry::{CropRect, Dimensions};

use crate::frames::MappedFrames;

/// Resampling filter for all geometric scaling.
const FILTER: FilterType = FilterType::Triangle;

/// Resample a frame to exactly `target`.
pub fn resize_frame(image: &RgbImage, target: Dimensions) -> RgbImage {
    if image.width() == target.width && image.height() == target.height {
        return image.clone();
    }
    imageops::resize(image, target.width, target.height, FILTER)
}

/// Copy out the pixels under `rect`.
pub fn crop_frame(image: &RgbImage, rect: CropRect) -> RgbImage {
    imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Scale by `factor` and crop the center back to the original size.
///
/// Returns `None` when the scaled frame is smaller than the original.
pub fn scale_crop_frame(image: &RgbImage, factor: f64) -> Option<RgbImage> {
    let original = Dimensions::new(image.width(), image.height());
    let scaled = original.scaled(factor);
    let rect = CropRect::centered(scaled, original)?;
    Some(crop_frame(&resize_frame(image, scaled), rect))
}

/// Center zoom by `zoom` (>= 1) without changing the frame size.
pub fn zoom_frame(image: &RgbImage, zoom: f64) -> RgbImage {
    let original = Dimensions::new(image.width(), image.height());
    let rect = CropRect::zoomed(original, zoom);
    resize_frame(&crop_frame(image, rect), original)
}

fn check_source(asset: &VideoAsset, stage: &str) -> SpinoffResult<()> {
    if asset.dimensions().is_degenerate() {
        return Err(SpinoffError::degenerate(
            stage,
            format!("source dimensions {} have a zero side", asset.dimensions()),
        ));
    }
    Ok(())
}

fn check_target(target: Dimensions, stage: &str) -> SpinoffResult<()> {
    if target.is_degenerate() {
        return Err(SpinoffError::degenerate(
            stage,
            format!("target dimensions {target} have a zero side"),
        ));
    }
    Ok(())
}

fn resize_to(asset: &VideoAsset, target: Dimensions, stage: &str) -> SpinoffResult<VideoAsset> {
    check_source(asset, stage)?;
    check_target(target, stage)?;

    let frames = MappedFrames::new(
        asset.frames(),
        stage,
        Arc::new(move |frame: Frame| {
            let image = resize_frame(&frame.image, target);
            frame.with_image(image)
        }),
    );
    asset
        .derive(stage)
        .dimensions(target)
        .frames(Arc::new(frames))
        .build()
}

/// Scale to exactly `width x height`, ignoring the source aspect ratio.
pub fn resize_fit(
    asset: &VideoAsset,
    width: u32,
    height: u32,
    stage: &str,
) -> SpinoffResult<VideoAsset> {
    resize_to(asset, Dimensions::new(width, height), stage)
}

/// Scale to a `max(w, h)` square, up-scaling the shorter dimension.
pub fn resize_square(asset: &VideoAsset, stage: &str) -> SpinoffResult<VideoAsset> {
    check_source(asset, stage)?;
    let side = asset.dimensions().long_side();
    resize_to(asset, Dimensions::square(side), stage)
}

/// Scale to an exact portrait target.
pub fn resize_vertical(
    asset: &VideoAsset,
    width: u32,
    height: u32,
    stage: &str,
) -> SpinoffResult<VideoAsset> {
    resize_to(asset, Dimensions::new(width, height), stage)
}

/// Scale by `factor`, then crop the center back to the input size.
///
/// The output keeps the input dimensions exactly, so a square stays square.
pub fn scale_crop(asset: &VideoAsset, factor: f64, stage: &str) -> SpinoffResult<VideoAsset> {
    check_source(asset, stage)?;
    if !(factor.is_finite() && factor > 0.0) {
        return Err(SpinoffError::degenerate(
            stage,
            format!("scale factor {factor} is not positive"),
        ));
    }

    let original = asset.dimensions();
    let scaled = original.scaled(factor);
    check_target(scaled, stage)?;
    let rect = CropRect::centered(scaled, original).ok_or_else(|| {
        SpinoffError::degenerate(
            stage,
            format!("crop {original} is larger than scaled source {scaled}"),
        )
    })?;

    let frames = MappedFrames::new(
        asset.frames(),
        stage,
        Arc::new(move |frame: Frame| {
            let image = crop_frame(&resize_frame(&frame.image, scaled), rect);
            frame.with_image(image)
        }),
    );
    asset.derive(stage).frames(Arc::new(frames)).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use spinoff_common::error::ErrorKind;
    use spinoff_media_model::synthetic::{synthetic_asset, Pattern};

    fn asset(w: u32, h: u32) -> VideoAsset {
        synthetic_asset("t", Dimensions::new(w, h), 1.0, 2.0, Pattern::Gradient).unwrap()
    }

    fn first_frame(asset: &VideoAsset) -> Frame {
        asset.open_frames().unwrap().next().unwrap().unwrap()
    }

    #[test]
    fn test_fit_ignores_aspect() {
        let out = resize_fit(&asset(64, 48), 32, 8, "fit").unwrap();
        assert_eq!(out.dimensions(), Dimensions::new(32, 8));
        assert_eq!(first_frame(&out).dimensions(), Dimensions::new(32, 8));
    }

    #[test]
    fn test_square_uses_long_side() {
        let out = resize_square(&asset(10, 20), "square").unwrap();
        assert_eq!(out.dimensions(), Dimensions::square(20));
        assert_eq!(first_frame(&out).dimensions(), Dimensions::square(20));
    }

    #[test]
    fn test_vertical_exact() {
        let out = resize_vertical(&asset(32, 18), 12, 18, "vertical").unwrap();
        assert_eq!(out.dimensions(), Dimensions::new(12, 18));
    }

    #[test]
    fn test_zero_target_fails() {
        let err = resize_fit(&asset(8, 8), 0, 8, "fit").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateGeometry);
    }

    #[test]
    fn test_scale_crop_keeps_dimensions() {
        let out = scale_crop(&asset(40, 40), 1.1, "scale").unwrap();
        assert_eq!(out.dimensions(), Dimensions::square(40));
        assert_eq!(first_frame(&out).dimensions(), Dimensions::square(40));
    }

    #[test]
    fn test_scale_crop_below_one_fails() {
        let err = scale_crop(&asset(40, 40), 0.9, "scale").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateGeometry);
        assert!(err.to_string().contains("larger than scaled source"));
    }

    #[test]
    fn test_scale_crop_frame_pushes_edges_out() {
        let img = RgbImage::from_fn(20, 20, |x, _| {
            if x == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let out = scale_crop_frame(&img, 1.5).unwrap();
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(out.get_pixel(0, 10).0[0], 0);
        assert!(scale_crop_frame(&img, 0.5).is_none());
    }

    #[test]
    fn test_zoom_frame_keeps_size() {
        let img = RgbImage::from_pixel(30, 20, Rgb([9, 9, 9]));
        let out = zoom_frame(&img, 1.2);
        assert_eq!(out.dimensions(), (30, 20));
        assert_eq!(out.get_pixel(15, 10).0, [9, 9, 9]);
    }

    #[test]
    fn test_parent_asset_unchanged() {
        let parent = asset(64, 48);
        let _ = resize_fit(&parent, 16, 16, "fit").unwrap();
        assert_eq!(parent.dimensions(), Dimensions::new(64, 48));
        assert_eq!(first_frame(&parent).dimensions(), Dimensions::new(64, 48));
    }
}
