//! Produce spin-offs for one source.

use std::path::PathBuf;

use spinoff_common::cancel::CancelToken;
use spinoff_common::config::AppConfig;
use spinoff_common::timing::format_timestamp;
use spinoff_media_model::request::TransformRequest;
use spinoff_render_engine::{EncodeBackend, TransformService};

pub async fn run(
    config: &AppConfig,
    source: PathBuf,
    platforms: Vec<String>,
    output_dir: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let service = TransformService::from_config(config);
    if !service.encoder().is_available() {
        anyhow::bail!(
            "{} not found (set encoder.ffmpeg_path in the config)",
            config.encoder.ffmpeg_path.display()
        );
    }

    let requests: Vec<TransformRequest> = platforms
        .iter()
        .map(|tag| {
            let request = TransformRequest::new(&source, tag.as_str());
            match &output_dir {
                Some(dir) => request.with_output_dir(dir),
                None => request,
            }
        })
        .collect();

    if !json {
        println!("Transforming: {}", source.display());
        println!("  Platforms: {}", platforms.join(", "));
        println!("  Workers: {}", service.workers());
    }

    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling transforms");
                cancel.cancel();
            }
        })
    };

    let results = service.transform_all(requests, cancel).await;
    ctrl_c.abort();

    let mut failures = 0usize;
    let mut report = Vec::with_capacity(results.len());
    for (tag, result) in platforms.iter().zip(results) {
        match result {
            Ok(done) => {
                if !json {
                    println!(
                        "[OK] {tag}: {} ({}x{}, {}, {}k/{}k, {:.1}s)",
                        done.output_path.display(),
                        done.width,
                        done.height,
                        format_timestamp(done.duration_secs),
                        done.video_bitrate_kbps,
                        done.audio_bitrate_kbps,
                        done.elapsed_secs
                    );
                }
                report.push(serde_json::json!({ "platform": tag, "result": done }));
            }
            Err(e) => {
                failures += 1;
                if !json {
                    println!("[FAIL] {tag}: {e}");
                }
                report.push(serde_json::json!({
                    "platform": tag,
                    "error": { "kind": format!("{:?}", e.kind()), "message": e.to_string() },
                }));
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} transforms failed", platforms.len());
    }
    Ok(())
}
