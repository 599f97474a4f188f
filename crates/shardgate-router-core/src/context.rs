//! Cancellation context threaded through every topology and executor call

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation scope of one logical call
///
/// Cloning shares the same cancellation token; [`Context::child`] derives a
/// scope that is canceled with its parent but can also be canceled alone.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never canceled unless [`Context::cancel`] is called
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child scope that inherits the parent's deadline
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fail if the context is already done
    pub fn check(&self) -> Result<(), ContextError> {
        if self.token.is_cancelled() {
            return Err(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `fut` until it completes or the context is done, whichever is first
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;
        let deadline = self.deadline;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ContextError::Canceled),
            _ = sleep_until(deadline) => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_cancel_stops_pending_future() {
        let ctx = Context::background();
        let canceler = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceler.cancel();
        });

        let result = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(ContextError::Canceled));
        assert_eq!(ctx.check(), Err(ContextError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let ctx = Context::with_timeout(Duration::from_secs(1));
        assert!(ctx.check().is_ok());

        let result = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
    }

    #[test]
    fn test_child_follows_parent() {
        let parent = Context::background();
        let child = parent.child();

        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }
}
