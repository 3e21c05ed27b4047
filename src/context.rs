//! # Request Context
//!
//! Every core operation takes a [`RequestContext`]: a cancellation token plus an
//! optional deadline. Operations call [`RequestContext::check`] on entry, before
//! taking a lock or doing I/O, so a caller that already gave up costs nothing.

use crate::error::{OrderError, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never cancels on its own.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context bound to an existing token (e.g. a task's shutdown token).
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derives a child context whose deadline is at most `timeout` from now.
    /// An earlier deadline inherited from `self` is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fails fast when the caller has given up.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(OrderError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(OrderError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
