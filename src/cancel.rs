use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ComicError, Result};

/// Shared flag between whoever started a fetch and the worker running it.
/// Workers poll it between units of work (one line, one entry).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Bail out with [`ComicError::Cancelled`] once the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ComicError::Cancelled)
        } else {
            Ok(())
        }
    }
}
