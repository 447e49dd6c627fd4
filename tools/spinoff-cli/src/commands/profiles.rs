//! List the built-in platform recipes.

use spinoff_media_model::profile::{Profile, TargetGeometry};
use spinoff_processing_core::ProfileRegistry;

pub fn run(json: bool) -> anyhow::Result<()> {
    let profiles: Vec<&Profile> = ProfileRegistry::global().profiles().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    for profile in profiles {
        let target = match profile.target {
            TargetGeometry::Exact { width, height } => format!("{width}x{height}"),
            TargetGeometry::Square => "square (long side of source)".to_string(),
        };
        let cap = profile
            .duration_cap_secs
            .map(|c| format!("{c}s"))
            .unwrap_or_else(|| "none".to_string());

        println!("{}", profile.platform);
        println!("  Target: {target}");
        println!("  Duration cap: {cap}");
        println!(
            "  Encode: {} / {} / {}",
            profile.encode.bitrate_arg(),
            profile.encode.audio_bitrate_arg(),
            profile.encode.preset.as_str()
        );
        println!("  Stages:");
        for (i, stage) in profile.stages.iter().enumerate() {
            println!("    {}. {}", i + 1, stage.label());
        }
        println!();
    }
    Ok(())
}
