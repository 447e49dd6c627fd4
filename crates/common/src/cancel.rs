//! Cooperative cancellation shared between a caller and a running transform.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{SpinoffError, SpinoffResult};

/// Clonable cancellation flag.
///
/// The pipeline polls it at stage boundaries and the encoder between
/// frames; nothing is interrupted mid-frame.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with [`SpinoffError::Cancelled`] if cancellation was requested.
    pub fn check(&self, during: &str) -> SpinoffResult<()> {
        if self.is_cancelled() {
            Err(SpinoffError::cancelled(format!("cancelled {during}")))
        } else {
            Ok(())
        }
    }
}
