//! Recipe resolution and the stage fold.
//!
//! ```text
//! tag ──► ProfileRegistry::resolve ──► Profile
//! path ─► AssetLoader::load ─────────► VideoAsset
//!                                         │
//!               stage[0] ► stage[1] ► … ► stage[n-1]
//!                                         │
//!                                         ▼
//!                          PreparedOutput { asset, encode }
//! ```
//!
//! Cancellation is checked before every stage. A failing stage aborts the
//! fold; its error is wrapped with the platform, stage index, and label.

use std::path::Path;
use std::sync::Arc;

use spinoff_common::cancel::CancelToken;
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_common::timing;
use spinoff_media_model::asset::VideoAsset;
use spinoff_media_model::platform::Platform;
use spinoff_media_model::profile::{EncodeSettings, Profile, TargetGeometry};

use crate::registry::ProfileRegistry;
use crate::stage::Transform;

/// Opens a source file as a [`VideoAsset`].
pub trait AssetLoader: Send + Sync {
    /// Fails with `SourceUnreadable` when the file is missing or cannot be
    /// decoded.
    fn load(&self, source: &Path) -> SpinoffResult<VideoAsset>;
}

/// A transformed asset ready to hand to the encoder.
#[derive(Debug, Clone)]
pub struct PreparedOutput {
    pub platform: Platform,
    pub asset: VideoAsset,
    pub encode: EncodeSettings,
}

/// Resolves recipes and applies them to loaded sources.
#[derive(Clone)]
pub struct PipelineExecutor {
    registry: Arc<ProfileRegistry>,
    loader: Arc<dyn AssetLoader>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<ProfileRegistry>, loader: Arc<dyn AssetLoader>) -> Self {
        Self { registry, loader }
    }

    /// Executor over the built-in recipes.
    pub fn with_builtin(loader: Arc<dyn AssetLoader>) -> Self {
        Self::new(Arc::new(ProfileRegistry::global().clone()), loader)
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Resolve `tag`, load `source`, and fold the recipe over it.
    ///
    /// The tag is resolved before the source is touched, so an unknown
    /// platform never opens the file.
    pub fn run(
        &self,
        source: &Path,
        tag: &str,
        cancel: &CancelToken,
    ) -> SpinoffResult<PreparedOutput> {
        let profile = self.registry.resolve(tag)?;
        cancel.check("before load")?;

        let asset = self.loader.load(source)?;
        tracing::info!(
            source = %source.display(),
            platform = %profile.platform,
            dimensions = %asset.dimensions(),
            duration_secs = asset.duration_secs(),
            frame_rate = asset.frame_rate(),
            has_audio = asset.has_audio(),
            "Loaded source"
        );

        let asset = apply_profile(profile, &asset, cancel)?;
        verify_output(profile, &asset)?;

        Ok(PreparedOutput {
            platform: profile.platform,
            asset,
            encode: profile.encode.clone(),
        })
    }
}

/// Apply every stage of `profile` to `asset`, left to right.
pub fn apply_profile(
    profile: &Profile,
    asset: &VideoAsset,
    cancel: &CancelToken,
) -> SpinoffResult<VideoAsset> {
    let platform = profile.platform.as_str();
    let mut current = asset.clone();

    for (index, stage) in profile.stages.iter().enumerate() {
        let label = stage.label();
        cancel
            .check(&format!("before stage {index} ({label})"))
            .map_err(|e| e.in_stage(platform, index, &label))?;

        current = stage
            .apply(&current)
            .map_err(|e| e.in_stage(platform, index, &label))?;

        tracing::debug!(
            platform,
            index,
            stage = %label,
            dimensions = %current.dimensions(),
            duration_secs = current.duration_secs(),
            "Stage applied"
        );
    }

    Ok(current)
}

/// Check the folded asset against the profile's promises.
pub fn verify_output(profile: &Profile, asset: &VideoAsset) -> SpinoffResult<()> {
    let dims = asset.dimensions();
    match profile.target {
        TargetGeometry::Exact { width, height } => {
            if dims.width != width || dims.height != height {
                return Err(SpinoffError::invalid_profile(format!(
                    "{}: output is {dims}, expected {width}x{height}",
                    profile.platform
                )));
            }
        }
        TargetGeometry::Square => {
            if !dims.is_square() {
                return Err(SpinoffError::invalid_profile(format!(
                    "{}: output {dims} is not square",
                    profile.platform
                )));
            }
        }
    }

    if let Some(cap) = profile.duration_cap_secs {
        let slack = timing::frame_interval(asset.frame_rate());
        if asset.duration_secs() > cap + slack {
            return Err(SpinoffError::invalid_profile(format!(
                "{}: output lasts {:.3}s, cap is {cap}s",
                profile.platform,
                asset.duration_secs()
            )));
        }
    }
    Ok(())
}
