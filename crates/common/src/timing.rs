//! Frame and timing utilities.
//!
//! Durations are carried as `f64` seconds and frame rates as `f64` frames per
//! second. These helpers keep the conversions between the two in one place so
//! every stage rounds the same way.

/// Number of frames covering `duration_secs` at `fps`, never less than one.
pub fn frame_count(duration_secs: f64, fps: f64) -> u64 {
    if !(duration_secs > 0.0) || !(fps > 0.0) {
        return 1;
    }
    ((duration_secs * fps).round() as u64).max(1)
}

/// Index of the frame displayed at `secs`.
pub fn frame_at(secs: f64, fps: f64) -> u64 {
    if !(secs > 0.0) || !(fps > 0.0) {
        return 0;
    }
    (secs * fps).floor() as u64
}

/// Duration of a single frame in seconds.
pub fn frame_interval(fps: f64) -> f64 {
    if fps > 0.0 {
        1.0 / fps
    } else {
        0.0
    }
}

/// Parse an ffprobe-style rate (`"30000/1001"`, `"25/1"`, `"29.97"`).
pub fn parse_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Format seconds as `HH:MM:SS.mmm` for human output.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_s / 3600,
        (total_s / 60) % 60,
        total_s % 60,
        ms
    )
}
