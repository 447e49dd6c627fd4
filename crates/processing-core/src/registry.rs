//! Built-in platform recipes and tag lookup.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use spinoff_common::error::{SpinoffError, SpinoffResult};
use spinoff_media_model::platform::Platform;
use spinoff_media_model::profile::{
    EncodePreset, EncodeSettings, OverlayKind, PixelFilterKind, Profile, ResizeMode, Stage,
    TargetGeometry,
};

static BUILTIN: Lazy<ProfileRegistry> = Lazy::new(ProfileRegistry::builtin);

/// Read-only map from platform to its recipe.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<Platform, Profile>,
}

impl ProfileRegistry {
    /// The process-wide built-in registry.
    pub fn global() -> &'static ProfileRegistry {
        &BUILTIN
    }

    /// The five platform recipes.
    pub fn builtin() -> Self {
        let profiles = [twitter(), instagram(), youtube(), pinterest(), facebook()]
            .into_iter()
            .map(|p| (p.platform, p))
            .collect();
        Self { profiles }
    }

    /// Build a registry from custom recipes. Each must validate and each
    /// platform may appear once.
    pub fn from_profiles(profiles: Vec<Profile>) -> SpinoffResult<Self> {
        let mut map = BTreeMap::new();
        for profile in profiles {
            profile.validate()?;
            let platform = profile.platform;
            if map.insert(platform, profile).is_some() {
                return Err(SpinoffError::invalid_profile(format!(
                    "{platform}: defined more than once"
                )));
            }
        }
        Ok(Self { profiles: map })
    }

    /// Look up a recipe by its user-facing tag.
    pub fn resolve(&self, tag: &str) -> SpinoffResult<&Profile> {
        let platform: Platform = tag.parse()?;
        self.get(platform)
            .ok_or_else(|| SpinoffError::unknown_platform(tag.trim()))
    }

    pub fn get(&self, platform: Platform) -> Option<&Profile> {
        self.profiles.get(&platform)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }
}

fn twitter() -> Profile {
    Profile {
        platform: Platform::Twitter,
        stages: vec![
            Stage::trim(140.0),
            Stage::resize(ResizeMode::Fit {
                width: 1280,
                height: 720,
            }),
            Stage::color(1.3, 0.0, 0.2),
        ],
        duration_cap_secs: Some(140.0),
        target: TargetGeometry::Exact {
            width: 1280,
            height: 720,
        },
        encode: EncodeSettings::h264_aac(2000, 128, EncodePreset::Fast),
    }
}

fn instagram() -> Profile {
    Profile {
        platform: Platform::Instagram,
        stages: vec![
            Stage::resize(ResizeMode::Square),
            Stage::color(1.2, 0.0, 0.0),
            Stage::resize(ResizeMode::ScaleCrop { factor: 1.1 }),
        ],
        duration_cap_secs: None,
        target: TargetGeometry::Square,
        encode: EncodeSettings::h264_aac(3500, 192, EncodePreset::Medium),
    }
}

fn youtube() -> Profile {
    Profile {
        platform: Platform::Youtube,
        stages: vec![
            Stage::resize(ResizeMode::Fit {
                width: 1920,
                height: 1080,
            }),
            Stage::color(1.0, 0.1, 0.1),
            Stage::end_overlay(OverlayKind::EndScreen, 20.0),
        ],
        duration_cap_secs: None,
        target: TargetGeometry::Exact {
            width: 1920,
            height: 1080,
        },
        encode: EncodeSettings::h264_aac(4000, 192, EncodePreset::Slow),
    }
}

fn pinterest() -> Profile {
    Profile {
        platform: Platform::Pinterest,
        stages: vec![
            Stage::resize(ResizeMode::Vertical {
                width: 1080,
                height: 1620,
            }),
            Stage::color(1.15, 0.05, 0.05),
            Stage::filter(PixelFilterKind::Vignette),
        ],
        duration_cap_secs: None,
        target: TargetGeometry::Exact {
            width: 1080,
            height: 1620,
        },
        encode: EncodeSettings::h264_aac(2500, 128, EncodePreset::Medium),
    }
}

fn facebook() -> Profile {
    Profile {
        platform: Platform::Facebook,
        stages: vec![
            Stage::resize(ResizeMode::Square),
            Stage::start_overlay(OverlayKind::ZoomedIntro, 3.0),
            Stage::speed(1.1),
        ],
        duration_cap_secs: None,
        target: TargetGeometry::Square,
        encode: EncodeSettings::h264_aac(2500, 128, EncodePreset::Medium),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spinoff_common::error::ErrorKind;

    #[test]
    fn test_builtin_covers_every_platform() {
        let registry = ProfileRegistry::builtin();
        for platform in Platform::ALL {
            let profile = registry.get(platform).unwrap();
            assert_eq!(profile.platform, platform);
            profile.validate().unwrap();
        }
        assert_eq!(registry.profiles().count(), 5);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = ProfileRegistry::global();
        assert_eq!(
            registry.resolve(" YouTube ").unwrap().platform,
            Platform::Youtube
        );
    }

    #[test]
    fn test_resolve_unknown_tag() {
        let err = ProfileRegistry::global().resolve("tiktok").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownPlatform);
    }

    #[test]
    fn test_missing_platform_in_custom_registry() {
        let registry = ProfileRegistry::from_profiles(vec![twitter()]).unwrap();
        assert!(registry.resolve("twitter").is_ok());
        assert_eq!(
            registry.resolve("instagram").unwrap_err().kind(),
            ErrorKind::UnknownPlatform
        );
    }

    #[test]
    fn test_duplicate_profile_rejected() {
        assert!(ProfileRegistry::from_profiles(vec![twitter(), twitter()]).is_err());
    }

    #[test]
    fn test_stage_order_is_part_of_recipe() {
        let registry = ProfileRegistry::builtin();
        let labels: Vec<String> = registry
            .get(Platform::Facebook)
            .unwrap()
            .stages
            .iter()
            .map(Stage::label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "resize(square)",
                "composite(zoomedintro, start+0s, 3s, overlay)",
                "speed(x1.1)"
            ]
        );
    }

    #[test]
    fn test_encode_settings_table() {
        let registry = ProfileRegistry::builtin();
        let rates: Vec<(u32, u32)> = Platform::ALL
            .iter()
            .map(|p| {
                let e = &registry.get(*p).unwrap().encode;
                (e.video_bitrate_kbps, e.audio_bitrate_kbps)
            })
            .collect();
        assert_eq!(
            rates,
            vec![(2000, 128), (3500, 192), (4000, 192), (2500, 128), (2500, 128)]
        );
    }
}
