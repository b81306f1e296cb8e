//! Retry on server overload.
//!
//! # Responsibilities
//! - Retry a call only when the server reports overload
//! - Bound the number of attempts and wait a fixed interval between them
//! - Stop waiting as soon as the caller cancels or the deadline would pass
//! - Fail fast without calling at all when the call is already over
//!
//! # Design Decisions
//! - Fixed delay, no jitter, no exponential growth
//! - Any other error is returned straight away
//! - Once an attempt has run, the last observed result is returned verbatim

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};

use crate::config::RetryConfig;
use crate::error::{CallError, CallFailure};
use crate::invoke::{CallContext, Invoker};
use crate::observability::metrics;

/// Attempt ceiling and delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

/// Run `operation`, retrying while it reports overload.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    ctx: &CallContext,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: CallFailure + From<CallError> + std::fmt::Display,
{
    if let Err(err) = ctx.check() {
        tracing::debug!(error = %err, "Call over before the first attempt");
        metrics::record_retry_outcome("aborted", 0);
        return Err(err.into());
    }

    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Err(err) if err.is_overload() && attempt < policy.max_attempts => err,
            Err(err) => {
                let outcome = if err.is_overload() { "exhausted" } else { "failed" };
                metrics::record_retry_outcome(outcome, attempt);
                return Err(err);
            }
            Ok(value) => {
                metrics::record_retry_outcome("success", attempt);
                return Ok(value);
            }
        };

        if ctx.cancel.is_cancelled() || ctx.would_exceed_deadline(Instant::now() + policy.backoff) {
            tracing::debug!(attempt, error = %err, "Abandoning retry before deadline");
            metrics::record_retry_outcome("aborted", attempt);
            return Err(err);
        }

        tracing::debug!(attempt, delay = ?policy.backoff, error = %err, "Retrying!");

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => {
                tracing::debug!(attempt, "Retry cancelled during backoff");
                metrics::record_retry_outcome("aborted", attempt);
                return Err(err);
            }
            () = time::sleep(policy.backoff) => {}
        }

        attempt += 1;
    }
}

/// Invoker wrapper that applies [`with_retry`] to every call.
#[derive(Debug, Clone)]
pub struct Retrying<I> {
    inner: I,
    policy: RetryPolicy,
}

impl<I> Retrying<I> {
    pub fn new(inner: I, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}

impl<I, Req> Invoker<Req> for Retrying<I>
where
    I: Invoker<Req>,
    I::Error: From<CallError> + std::fmt::Display,
    Req: Sync,
{
    type Response = I::Response;
    type Error = I::Error;

    async fn invoke(&self, request: &Req, ctx: &CallContext) -> Result<I::Response, I::Error> {
        with_retry(&self.policy, ctx, || self.inner.invoke(request, ctx)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Returns overload for the first `overloads` calls, then succeeds.
    struct Scripted {
        calls: AtomicU32,
        overloads: u32,
        error: CallError,
    }

    impl Scripted {
        fn new(overloads: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                overloads,
                error: CallError::Overloaded("ruh roh".into()),
            }
        }

        fn failing(error: CallError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                overloads: u32::MAX,
                error,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Invoker<()> for Scripted {
        type Response = u32;
        type Error = CallError;

        async fn invoke(&self, _: &(), _: &CallContext) -> Result<u32, CallError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.overloads {
                Err(self.error.clone())
            } else {
                Ok(n)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_fifth_attempt() {
        let retrying = Retrying::new(Scripted::new(4), RetryPolicy::default());
        let start = Instant::now();

        let result = retrying.invoke(&(), &CallContext::new()).await;
        assert_eq!(result, Ok(5));
        assert_eq!(retrying.inner().calls(), 5);
        assert!(start.elapsed() >= Duration::from_secs(4));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_overloaded_stops_after_five() {
        let retrying = Retrying::new(Scripted::new(u32::MAX), RetryPolicy::default());

        let result = retrying.invoke(&(), &CallContext::new()).await;
        assert_eq!(result, Err(CallError::Overloaded("ruh roh".into())));
        assert_eq!(retrying.inner().calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_not_retried() {
        let retrying = Retrying::new(
            Scripted::failing(CallError::Failed("reset".into())),
            RetryPolicy::default(),
        );

        let result = retrying.invoke(&(), &CallContext::new()).await;
        assert_eq!(result, Err(CallError::Failed("reset".into())));
        assert_eq!(retrying.inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let policy = RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(10),
        };
        let retrying = Retrying::new(Scripted::new(u32::MAX), policy);

        assert!(retrying.invoke(&(), &CallContext::new()).await.is_err());
        assert_eq!(retrying.inner().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_instead_of_sleeping() {
        let retrying = Retrying::new(Scripted::new(u32::MAX), RetryPolicy::default());
        let start = Instant::now();
        let ctx = CallContext::new().with_deadline(start + Duration::from_millis(2500));

        let result = retrying.invoke(&(), &ctx).await;
        assert!(matches!(result, Err(CallError::Overloaded(_))));
        // Attempts at t=0s, 1s, 2s; a third sleep would end past the deadline.
        assert_eq!(retrying.inner().calls(), 3);
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let retrying = Retrying::new(Scripted::new(u32::MAX), RetryPolicy::default());
        let ctx = CallContext::new();
        let cancel = ctx.cancel.clone();
        let start = Instant::now();

        tokio::spawn(async move {
            time::sleep(Duration::from_millis(1500)).await;
            cancel.cancel();
        });

        let result = retrying.invoke(&(), &ctx).await;
        assert!(result.is_err());
        assert_eq!(retrying.inner().calls(), 2);
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_fails_fast() {
        let retrying = Retrying::new(Scripted::new(0), RetryPolicy::default());
        let ctx = CallContext::new();
        ctx.cancel.cancel();

        assert_eq!(retrying.invoke(&(), &ctx).await, Err(CallError::Cancelled));
        assert_eq!(retrying.inner().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_fails_fast() {
        let retrying = Retrying::new(Scripted::new(0), RetryPolicy::default());
        let ctx = CallContext::new().with_deadline(Instant::now());

        assert_eq!(retrying.invoke(&(), &ctx).await, Err(CallError::DeadlineExceeded));
        assert_eq!(retrying.inner().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_closure() {
        let mut calls = 0;
        let result: Result<(), CallError> = with_retry(&RetryPolicy::default(), &CallContext::new(), || {
            calls += 1;
            async { Err(CallError::Overloaded("busy".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 5);
    }
}
