//! Spinoff Media Model
//!
//! Defines the core data contracts of the spin-off pipeline:
//! - **Assets:** Immutable video handles with lazy, re-openable frame streams
//! - **Geometry:** Pixel dimensions and crop windows
//! - **Profiles:** Per-platform stage recipes and encode settings
//! - **Requests:** Transform requests, results, and output naming
//!
//! Nothing here decodes or encodes media; that lives in the render engine.

pub mod asset;
pub mod geometry;
pub mod platform;
pub mod profile;
pub mod request;
pub mod synthetic;

pub use asset::*;
pub use geometry::*;
pub use platform::*;
pub use profile::*;
pub use request::*;
