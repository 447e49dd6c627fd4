//! Error types shared across Spinoff crates.

use std::path::PathBuf;

/// Top-level error type for Spinoff operations.
#[derive(Debug, thiserror::Error)]
pub enum SpinoffError {
    #[error("Unknown platform: {tag:?} (expected one of: twitter, instagram, youtube, pinterest, facebook)")]
    UnknownPlatform { tag: String },

    #[error("Source unreadable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Degenerate geometry in {stage}: {detail}")]
    DegenerateGeometry { stage: String, detail: String },

    #[error("Encode failed for {output}: {message}")]
    EncodeFailed {
        output: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failure inside one stage of a platform recipe.
    #[error("Stage {index} ({stage}) failed for platform {platform}: {source}")]
    Stage {
        platform: String,
        index: usize,
        stage: String,
        #[source]
        source: Box<SpinoffError>,
    },

    #[error("Transform cancelled: {message}")]
    Cancelled { message: String },

    #[error("Invalid profile: {message}")]
    InvalidProfile { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SpinoffError.
pub type SpinoffResult<T> = Result<T, SpinoffError>;

/// Coarse classification of a [`SpinoffError`], independent of the
/// context it was wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownPlatform,
    SourceUnreadable,
    DegenerateGeometry,
    EncodeFailed,
    Cancelled,
    Other,
}

impl SpinoffError {
    pub fn unknown_platform(tag: impl Into<String>) -> Self {
        Self::UnknownPlatform { tag: tag.into() }
    }

    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn degenerate(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            stage: stage.into(),
            detail: detail.into(),
        }
    }

    pub fn encode_failed(output: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::EncodeFailed {
            output: output.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn encode_io(
        output: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::EncodeFailed {
            output: output.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled {
            message: msg.into(),
        }
    }

    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self::InvalidProfile {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Attach pipeline context (platform, stage position, stage label).
    pub fn in_stage(self, platform: impl Into<String>, index: usize, stage: impl Into<String>) -> Self {
        Self::Stage {
            platform: platform.into(),
            index,
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// The error kind, looking through any stage context.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownPlatform { .. } => ErrorKind::UnknownPlatform,
            Self::SourceUnreadable { .. } => ErrorKind::SourceUnreadable,
            Self::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
            Self::EncodeFailed { .. } => ErrorKind::EncodeFailed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Stage { source, .. } => source.kind(),
            _ => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sees_through_stage_context() {
        let err = SpinoffError::degenerate("resize(square)", "source width is 0")
            .in_stage("instagram", 0, "resize(square)");
        assert_eq!(err.kind(), ErrorKind::DegenerateGeometry);

        let msg = err.to_string();
        assert!(msg.contains("instagram"));
        assert!(msg.contains("source width is 0"));
    }

    #[test]
    fn test_io_errors_are_other() {
        let err: SpinoffError = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_unknown_platform_message_names_tag() {
        let err = SpinoffError::unknown_platform("tiktok");
        assert_eq!(err.kind(), ErrorKind::UnknownPlatform);
        assert!(err.to_string().contains("\"tiktok\""));
    }
}
