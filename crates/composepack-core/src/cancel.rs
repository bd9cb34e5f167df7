//! Cooperative cancellation for I/O-bound steps
//!
//! Every I/O-bound operation in the core (chart load, download, metadata
//! read/write, compose invocation) checks the token before starting work and
//! fails fast with `CoreError::Cancelled` instead of partially completing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::error::{CoreError, Result};

/// Shared cancellation handle with an optional deadline.
///
/// Cloning shares the underlying flag, so cancelling any clone cancels all.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Create a token that never fires unless explicitly cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that also fires once the deadline has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True if cancelled or past the deadline
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Fail fast if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fresh_token_passes() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(matches!(clone.check(), Err(CoreError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_cancels() {
        let token = CancelToken::with_deadline(Instant::now() - Duration::from_secs(1));
        assert!(token.is_cancelled());
    }
}
