use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ScoreError;

/// Cooperative cancellation for one scoring call.
///
/// Clones share the same flag, so the request handler keeps one copy and
/// hands another to the pipeline.  Setting it never touches the shared model.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once the flag is set.
    pub fn check(&self) -> Result<(), ScoreError> {
        if self.is_cancelled() {
            Err(ScoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
