//! Cooperative cancellation for long-running, network-touching git
//! operations (push, and eventually clone/fetch/pull).
//!
//! A [`CancelToken`] pairs an externally-flippable flag with an optional
//! deadline. Callers that own the token (the CLI, wiring SIGINT) cancel it
//! from another thread; the git operation itself only needs to poll it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A shared, cooperatively-checked cancellation signal with an optional deadline.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that expires `timeout` from now, in addition to being
    /// externally cancellable.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// A token that is never cancelled unless [`Self::cancel`] is called
    /// explicitly (no deadline).
    #[must_use]
    pub fn no_deadline() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Signal cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// `true` if [`Self::cancel`] was called, or the deadline has passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl Default for CancelToken {
    /// 30 second deadline, matching the default for push/fetch/pull/clone.
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancelToken::no_deadline().is_cancelled());
    }

    #[test]
    fn explicit_cancel_is_observed() {
        let token = CancelToken::no_deadline();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clone_shares_cancellation_state() {
        let token = CancelToken::no_deadline();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn elapsed_deadline_is_treated_as_cancelled() {
        let token = CancelToken::with_timeout(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        assert!(token.is_cancelled());
    }

    #[test]
    fn default_has_a_thirty_second_deadline() {
        let token = CancelToken::default();
        assert!(!token.is_cancelled());
    }
}
