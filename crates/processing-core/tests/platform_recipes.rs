use std::path::Path;
use std::sync::Arc;

use proptest::prelude::*;
use spinoff_common::cancel::CancelToken;
use spinoff_common::error::{ErrorKind, SpinoffResult};
use spinoff_media_model::asset::VideoAsset;
use spinoff_media_model::geometry::Dimensions;
use spinoff_media_model::synthetic::{synthetic_asset, Pattern};
use spinoff_processing_core::composite::END_CARD_COLOR;
use spinoff_processing_core::pixel::mean_intensity;
use spinoff_processing_core::{AssetLoader, PipelineExecutor, PreparedOutput};

/// Generates a source of fixed geometry regardless of the path.
struct FixedLoader {
    dimensions: Dimensions,
    duration_secs: f64,
    frame_rate: f64,
    pattern: Pattern,
}

impl FixedLoader {
    fn new(width: u32, height: u32, duration_secs: f64, frame_rate: f64) -> Self {
        Self {
            dimensions: Dimensions::new(width, height),
            duration_secs,
            frame_rate,
            pattern: Pattern::Gradient,
        }
    }

    fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }
}

impl AssetLoader for FixedLoader {
    fn load(&self, source: &Path) -> SpinoffResult<VideoAsset> {
        synthetic_asset(
            &source.to_string_lossy(),
            self.dimensions,
            self.duration_secs,
            self.frame_rate,
            self.pattern,
        )
    }
}

fn run(loader: FixedLoader, tag: &str) -> SpinoffResult<PreparedOutput> {
    PipelineExecutor::with_builtin(Arc::new(loader)).run(
        Path::new("clip.mp4"),
        tag,
        &CancelToken::new(),
    )
}

#[test]
fn twitter_long_source_is_capped_and_boxed() {
    let out = run(FixedLoader::new(1920, 1080, 300.0, 1.0), "twitter").unwrap();
    assert_eq!(out.asset.dimensions(), Dimensions::new(1280, 720));
    assert_eq!(out.asset.duration_secs(), 140.0);
    assert_eq!(out.asset.frame_count(), 140);
    assert_eq!(out.encode.bitrate_arg(), "2000k");
    assert_eq!(out.encode.audio_bitrate_arg(), "128k");
}

#[test]
fn twitter_short_source_keeps_duration() {
    let out = run(FixedLoader::new(640, 480, 12.5, 4.0), "twitter").unwrap();
    assert_eq!(out.asset.duration_secs(), 12.5);
    assert_eq!(out.asset.dimensions(), Dimensions::new(1280, 720));
}

#[test]
fn instagram_portrait_upscales_to_long_side_square() {
    let out = run(FixedLoader::new(1000, 2000, 10.0, 1.0), "instagram").unwrap();
    assert_eq!(out.asset.dimensions(), Dimensions::square(2000));
    assert_eq!(out.asset.duration_secs(), 10.0);
}

#[test]
fn youtube_end_screen_overlays_last_twenty_seconds() {
    let loader = FixedLoader::new(1920, 1080, 30.0, 0.5);
    let out = run(loader, "youtube").unwrap();

    assert_eq!(out.asset.duration_secs(), 30.0);
    assert_eq!(out.asset.dimensions(), Dimensions::new(1920, 1080));

    let centers: Vec<[u8; 3]> = out
        .asset
        .open_frames()
        .unwrap()
        .map(|frame| frame.map(|f| f.image.get_pixel(960, 540).0))
        .collect::<SpinoffResult<_>>()
        .unwrap();
    assert_eq!(centers.len(), 15);

    // Frame 5 is t = 10s, the first frame of the end screen.
    assert_ne!(centers[4], END_CARD_COLOR);
    assert_eq!(centers[5], END_CARD_COLOR);
    assert_eq!(centers[14], END_CARD_COLOR);
}

#[test]
fn youtube_short_source_skips_end_screen() {
    let out = run(FixedLoader::new(1280, 720, 20.0, 1.0), "youtube").unwrap();
    assert_eq!(out.asset.duration_secs(), 20.0);
    assert!(out
        .asset
        .history()
        .iter()
        .all(|label| !label.starts_with("composite")));
}

#[test]
fn pinterest_vignette_darkens_corners() {
    let loader = FixedLoader::new(1080, 1920, 5.0, 1.0).pattern(Pattern::Solid([180, 180, 180]));
    let out = run(loader, "pinterest").unwrap();
    assert_eq!(out.asset.dimensions(), Dimensions::new(1080, 1620));

    let frame = out.asset.open_frames().unwrap().next().unwrap().unwrap();
    let center = frame.image.get_pixel(540, 810).0[0];
    for (x, y) in [(0, 0), (1079, 0), (0, 1619), (1079, 1619)] {
        let corner = frame.image.get_pixel(x, y).0[0];
        assert!(corner + 100 < center, "corner {corner} vs center {center}");
    }
    assert!(mean_intensity(&frame.image) < center as f64);
}

#[test]
fn facebook_intro_then_speedup() {
    let out = run(FixedLoader::new(1280, 720, 11.0, 2.0), "facebook").unwrap();
    assert_eq!(out.asset.dimensions(), Dimensions::square(1280));
    assert!((out.asset.duration_secs() - 10.0).abs() < 1e-9);
    assert_eq!(out.asset.history().len(), 3);
}

#[test]
fn unknown_platform_is_rejected() {
    let err = run(FixedLoader::new(64, 64, 1.0, 1.0), "tiktok").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownPlatform);
}

#[test]
fn same_input_gives_same_shape() {
    for tag in ["twitter", "instagram", "youtube", "pinterest", "facebook"] {
        let a = run(FixedLoader::new(800, 600, 45.0, 1.0), tag).unwrap();
        let b = run(FixedLoader::new(800, 600, 45.0, 1.0), tag).unwrap();
        assert_eq!(a.asset.dimensions(), b.asset.dimensions(), "{tag}");
        assert_eq!(a.asset.duration_secs(), b.asset.duration_secs(), "{tag}");
        assert_eq!(a.asset.history(), b.asset.history(), "{tag}");
    }
}

#[test]
fn source_asset_is_untouched_by_fold() {
    let loader = FixedLoader::new(320, 240, 30.0, 1.0);
    let source = loader.load(Path::new("clip.mp4")).unwrap();
    let registry = spinoff_processing_core::ProfileRegistry::global();
    for profile in registry.profiles() {
        let _ = spinoff_processing_core::pipeline::apply_profile(
            profile,
            &source,
            &CancelToken::new(),
        )
        .unwrap();
    }
    assert_eq!(source.dimensions(), Dimensions::new(320, 240));
    assert_eq!(source.duration_secs(), 30.0);
    assert!(source.history().is_empty());
}

/// Property: square platforms produce square output for any aspect ratio.
#[test]
fn proptest_square_platforms_stay_square() {
    proptest!(|(w in 1u32..4000, h in 1u32..4000, secs in 0.5f64..120.0)| {
        for tag in ["instagram", "facebook"] {
            let out = run(FixedLoader::new(w, h, secs, 1.0), tag);
            prop_assert!(out.is_ok(), "{tag} {w}x{h}: {:?}", out.as_ref().err());
            if let Ok(out) = out {
                let dims = out.asset.dimensions();
                prop_assert_eq!(dims.width, dims.height);
                prop_assert_eq!(dims.width, w.max(h));
            }
        }
    });
}

/// Property: twitter output is exactly 1280x720 and never exceeds 140s.
#[test]
fn proptest_twitter_cap_and_box() {
    proptest!(|(w in 1u32..4000, h in 1u32..4000, secs in 0.5f64..600.0, fps in 1.0f64..60.0)| {
        let out = run(FixedLoader::new(w, h, secs, fps), "twitter");
        prop_assert!(out.is_ok());
        if let Ok(out) = out {
            prop_assert_eq!(out.asset.dimensions(), Dimensions::new(1280, 720));
            let expected = secs.min(140.0);
            prop_assert!((out.asset.duration_secs() - expected).abs() <= 1.0 / fps);
        }
    });
}

/// Property: youtube output always matches its fixed box.
#[test]
fn proptest_youtube_box() {
    proptest!(|(w in 1u32..4000, h in 1u32..4000, secs in 0.5f64..120.0)| {
        let out = run(FixedLoader::new(w, h, secs, 1.0), "youtube");
        prop_assert!(out.is_ok());
        if let Ok(out) = out {
            prop_assert_eq!(out.asset.dimensions(), Dimensions::new(1920, 1080));
            prop_assert_eq!(out.asset.duration_secs(), secs);
        }
    });
}
