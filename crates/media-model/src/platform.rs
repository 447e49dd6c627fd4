//! Supported social-media platforms.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use spinoff_common::error::SpinoffError;

/// A platform a spin-off can be produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Instagram,
    Youtube,
    Pinterest,
    Facebook,
}

impl Platform {
    /// Every supported platform, in registry order.
    pub const ALL: [Platform; 5] = [
        Platform::Twitter,
        Platform::Instagram,
        Platform::Youtube,
        Platform::Pinterest,
        Platform::Facebook,
    ];

    /// The lowercase tag used on the command line and in output file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Pinterest => "pinterest",
            Platform::Facebook => "facebook",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SpinoffError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| SpinoffError::unknown_platform(value))
    }
}
