//! Per-operation deadline and cancellation

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;

/// Deadline plus cancellation signal carried by every cache call.
///
/// Request handlers build one per inbound request (usually with a sub-second
/// timeout) and hand it to each component they touch. Cloning shares the
/// cancellation token.
#[derive(Debug, Clone)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl OpContext {
    /// No deadline, never cancelled. For probes and tests.
    pub fn background() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// A timeout too large to represent leaves the context without a deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelled whenever `parent` is, bounded by `timeout`.
    pub fn child(parent: &CancellationToken, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: parent.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fails if the context is already dead.
    pub fn check(&self) -> Result<(), CacheError> {
        if self.cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CacheError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Runs `op` unless the context is already dead, then races it against
    /// cancellation and the deadline.
    pub async fn run<F, T>(&self, op: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CacheError::Cancelled),
            _ = wait_for(self.deadline) => Err(CacheError::DeadlineExceeded),
            res = op => res,
        }
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
