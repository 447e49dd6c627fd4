//! Spinoff Processing Core: the platform transformation pipeline.
//!
//! Maps a (source, platform) pair to an ordered recipe of stages and folds
//! them over a lazily decoded [`VideoAsset`](spinoff_media_model::VideoAsset):
//! - **Pixel ops:** color scale, luminance/contrast, vignette
//! - **Geometry ops:** fit, square, vertical, scale-then-crop
//! - **Composites:** end screen and zoomed intro
//! - **Registry:** the built-in per-platform recipes
//! - **Executor:** resolve, load, fold, verify
//!
//! This crate does no I/O of its own. Sources come in through an
//! [`AssetLoader`] and the folded asset goes back out to the caller for
//! encoding.

pub mod composite;
pub mod frames;
pub mod geometry;
pub mod pipeline;
pub mod pixel;
pub mod registry;
pub mod stage;

pub use pipeline::{AssetLoader, PipelineExecutor, PreparedOutput};
pub use registry::ProfileRegistry;
pub use stage::Transform;
