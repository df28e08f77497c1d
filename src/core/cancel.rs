//! Cooperative cancellation for long-running fits
//!
//! A [`CancellationToken`] is cheap to clone and is polled by the algorithms at
//! natural boundaries (between K-means iterations, forest trees, Apriori levels,
//! ARIMA fits). Once cancelled it stays cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::error::{Error, Result};

/// Shared cancellation flag with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token that is only cancelled through [`CancellationToken::cancel`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that additionally expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Token that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation; visible to every clone of this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Return `Error::Cancelled` if the token was cancelled or its deadline passed
    pub fn check(&self) -> Result<()> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(Error::Cancelled("cancellation requested".into()));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::Cancelled("deadline exceeded".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(clone.check().is_ok());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(Error::Cancelled(_))));
    }

    #[test]
    fn test_expired_deadline() {
        let token = CancellationToken::with_timeout(Duration::from_secs(0));
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled(msg)) if msg.contains("deadline")));
    }

    #[test]
    fn test_future_deadline_not_cancelled() {
        let token = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(!token.is_cancelled());
    }
}
