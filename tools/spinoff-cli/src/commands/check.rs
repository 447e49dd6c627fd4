//! Check codec tooling and run a small end-to-end encode.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use spinoff_common::cancel::CancelToken;
use spinoff_common::config::AppConfig;
use spinoff_media_model::geometry::Dimensions;
use spinoff_media_model::platform::Platform;
use spinoff_media_model::synthetic::{synthetic_asset, Pattern};
use spinoff_processing_core::pipeline::{apply_profile, verify_output};
use spinoff_processing_core::ProfileRegistry;
use spinoff_render_engine::{probe, EncodeBackend, FfmpegEncoder};

fn binary_works(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Fold the twitter recipe over a generated clip, encode it, and probe the
/// result back.
fn smoke_encode(config: &AppConfig, output: &Path) -> anyhow::Result<()> {
    let registry = ProfileRegistry::global();
    let profile = registry
        .get(Platform::Twitter)
        .ok_or_else(|| anyhow::anyhow!("twitter profile missing"))?;

    let source = synthetic_asset(
        "synthetic",
        Dimensions::new(320, 180),
        1.0,
        10.0,
        Pattern::Gradient,
    )?;
    let cancel = CancelToken::new();
    let asset = apply_profile(profile, &source, &cancel)?;
    verify_output(profile, &asset)?;

    let encoder = FfmpegEncoder::from_config(&config.encoder);
    encoder.encode(&asset, &profile.encode, output, &cancel)?;

    let info = probe(&config.encoder.ffprobe_path, output)?;
    if (info.width, info.height) != (asset.width(), asset.height()) {
        anyhow::bail!(
            "encoded {}x{}, expected {}",
            info.width,
            info.height,
            asset.dimensions()
        );
    }
    Ok(())
}

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Spinoff System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg_ok = binary_works(&config.encoder.ffmpeg_path);
    let ffprobe_ok = binary_works(&config.encoder.ffprobe_path);
    for (name, path, ok) in [
        ("ffmpeg", &config.encoder.ffmpeg_path, ffmpeg_ok),
        ("ffprobe", &config.encoder.ffprobe_path, ffprobe_ok),
    ] {
        if ok {
            println!("[OK] {name}: {}", path.display());
        } else {
            println!("[FAIL] {name}: {} not runnable", path.display());
        }
    }
    println!(
        "[OK] Workers: {} concurrent, {} encoder threads",
        config.workers.resolved_jobs(),
        config.encoder.resolved_threads()
    );

    if !(ffmpeg_ok && ffprobe_ok) {
        println!();
        println!("Install ffmpeg or point encoder.ffmpeg_path / encoder.ffprobe_path at it.");
        anyhow::bail!("codec tooling unavailable");
    }

    let output: PathBuf =
        std::env::temp_dir().join(format!("spinoff-check-{}.mp4", std::process::id()));
    let task_config = config.clone();
    let task_output = output.clone();
    let outcome =
        tokio::task::spawn_blocking(move || smoke_encode(&task_config, &task_output)).await?;
    let _ = std::fs::remove_file(&output);

    match outcome {
        Ok(()) => {
            println!("[OK] Smoke encode: synthetic clip through the twitter recipe");
            println!();
            println!("Spinoff is ready.");
            Ok(())
        }
        Err(e) => {
            println!("[FAIL] Smoke encode: {e}");
            Err(e)
        }
    }
}
