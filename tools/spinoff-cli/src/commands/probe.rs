//! Show what ffprobe reports for a source.

use std::path::PathBuf;

use spinoff_common::config::AppConfig;
use spinoff_common::timing::format_timestamp;
use spinoff_render_engine::{probe, validate_media};

pub fn run(config: &AppConfig, source: PathBuf, json: bool) -> anyhow::Result<()> {
    let size = validate_media(&source, &config.validation)?;
    let info = probe(&config.encoder.ffprobe_path, &source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Source: {}", source.display());
    println!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    println!("  Resolution: {}x{}", info.width, info.height);
    println!("  Frame rate: {:.3} fps", info.frame_rate);
    println!(
        "  Duration: {} ({:.3}s)",
        format_timestamp(info.duration_secs),
        info.duration_secs
    );
    println!(
        "  Video codec: {}",
        info.video_codec.as_deref().unwrap_or("unknown")
    );
    println!("  Audio: {}", if info.has_audio { "yes" } else { "no" });
    Ok(())
}
