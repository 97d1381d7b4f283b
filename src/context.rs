//! Per-dial cancellation and deadline.
//!
//! A [`DialContext`] is cheap to clone; every blocking step of a dial is
//! raced against it, and losing the race drops the in-flight step, which
//! closes whatever socket that step owned.

use crate::error::DialError;
use std::future::{pending, Future};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct DialContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl DialContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a cancellable context. The returned token is a child of any
    /// token already attached, so cancelling the parent still reaches this
    /// context; cancelling the child leaves the parent untouched.
    pub fn with_cancel(mut self) -> (Self, CancellationToken) {
        let token = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        self.cancel = Some(token.clone());
        (self, token)
    }

    /// Ties the context to a token owned by the caller, e.g. a server's
    /// shutdown token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }

    async fn cancelled(&self) {
        match &self.cancel {
            Some(token) => token.cancelled().await,
            None => pending().await,
        }
    }

    async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => pending().await,
        }
    }

    /// Runs `fut` until it completes or the context ends. Cancellation wins
    /// ties so an already-cancelled context never starts work.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, DialError> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(DialError::Cancelled),
            _ = self.expired() => Err(DialError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_background_runs_to_completion() {
        let ctx = DialContext::background();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_work() {
        let (ctx, token) = DialContext::background().with_cancel();
        let task = tokio::spawn(async move { ctx.run(pending::<()>()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let res = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("cancellation must be prompt")
            .unwrap();
        assert!(matches!(res, Err(DialError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_starts() {
        let (ctx, token) = DialContext::background().with_cancel();
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.run(async { 1 }).await, Err(DialError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropped_token_does_not_cancel() {
        let (ctx, token) = DialContext::background().with_cancel();
        drop(token);
        assert_eq!(ctx.run(async { 3 }).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_parent_token_reaches_derived_context() {
        let shutdown = CancellationToken::new();
        let (ctx, child) = DialContext::background()
            .with_token(shutdown.clone())
            .with_cancel();
        // cancelling the child does not touch the parent
        let (sibling, own) = DialContext::background()
            .with_token(shutdown.clone())
            .with_cancel();
        own.cancel();
        assert!(sibling.is_cancelled());
        assert!(!shutdown.is_cancelled());
        assert!(!ctx.is_cancelled());

        shutdown.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(ctx.run(pending::<()>()).await, Err(DialError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline() {
        let ctx = DialContext::background().with_timeout(Duration::from_millis(10));
        assert!(matches!(
            ctx.run(pending::<()>()).await,
            Err(DialError::DeadlineExceeded)
        ));
    }

    #[test]
    fn test_earliest_deadline_wins() {
        let now = Instant::now();
        let ctx = DialContext::background()
            .with_deadline(now + Duration::from_secs(5))
            .with_deadline(now + Duration::from_secs(1));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
