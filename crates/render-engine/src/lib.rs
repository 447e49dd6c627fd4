//! Spinoff Render Engine
//!
//! Everything around the transformation pipeline that touches the outside
//! world: source checks, probing, decoding, encoding, and the worker pool
//! that runs requests.
//!
//! # Pipeline Architecture
//!
//! ```text
//! clip.mp4 ── validate ── ffprobe ──┐
//!                                   ├── FfmpegFrameSource (rgb24 frames, lazy)
//!                                   │         │
//! platform tag ── ProfileRegistry ──┤   stage fold (processing-core)
//!                                   │         │
//!                                   │         ▼
//! clip.mp4 (audio) ─────────────────┴──► ffmpeg encode (-af edits)
//!                                             │
//!                                             ▼
//!                             .clip_spinoff_<platform>.partial.mp4
//!                                             │ rename on success
//!                                             ▼
//!                                clip_spinoff_<platform>.mp4
//! ```

pub mod decode;
pub mod encode;
pub mod probe;
pub mod service;
pub mod validate;

pub use decode::{FfmpegFrameSource, FfmpegLoader};
pub use encode::{EncodeBackend, EncodeSummary, FfmpegEncoder};
pub use probe::{probe, MediaInfo};
pub use service::TransformService;
pub use validate::validate_media;
