//! Spinoff Common Utilities
//!
//! Shared infrastructure for all Spinoff crates:
//! - Error types and result aliases
//! - Frame/second timing helpers
//! - Cooperative cancellation
//! - Tracing/logging initialization
//! - Configuration loading

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod timing;

pub use cancel::*;
pub use config::*;
pub use error::*;
