//! Run cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DbSliceError, Result};

/// Cloneable cancellation flag for a sampling run.
///
/// The engine checks it before every work-list step and every blocking
/// database call; once tripped, the next check surfaces
/// `DbSliceError::Cancelled` and in-flight transactions roll back on drop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Err(`Cancelled`) once the token has been tripped.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DbSliceError::Cancelled)
        } else {
            Ok(())
        }
    }
}
