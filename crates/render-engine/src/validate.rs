//! Cheap checks on a source file before any codec is spawned.

use std::path::Path;

use spinoff_common::config::ValidationConfig;
use spinoff_common::error::{SpinoffError, SpinoffResult};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Confirm `path` is a non-empty regular file within the size limit whose
/// extension, if it has one, is accepted. Returns its size in bytes.
pub fn validate_media(path: &Path, rules: &ValidationConfig) -> SpinoffResult<u64> {
    let meta = std::fs::metadata(path)
        .map_err(|e| SpinoffError::source_unreadable(path, format!("cannot stat file: {e}")))?;
    if !meta.is_file() {
        return Err(SpinoffError::source_unreadable(path, "not a regular file"));
    }

    // No extension: ffprobe decides.
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_ascii_lowercase();
        if !rules
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
        {
            return Err(SpinoffError::source_unreadable(
                path,
                format!(
                    "unsupported extension {ext:?} (allowed: {})",
                    rules.allowed_extensions.join(", ")
                ),
            ));
        }
    }

    let size = meta.len();
    if size == 0 {
        return Err(SpinoffError::source_unreadable(path, "file is empty"));
    }
    let limit = rules.max_size_mb.saturating_mul(BYTES_PER_MB);
    if size > limit {
        return Err(SpinoffError::source_unreadable(
            path,
            format!(
                "file is {:.1} MB, limit is {} MB",
                size as f64 / BYTES_PER_MB as f64,
                rules.max_size_mb
            ),
        ));
    }

    tracing::debug!(path = %path.display(), size, "Source passed validation");
    Ok(size)
}
