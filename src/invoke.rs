//! Call invocation contract shared by the balanced channel and the retry wrapper.

use std::future::Future;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{CallError, CallFailure};

/// Per-call cancellation and deadline supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl CallContext {
    /// Context with no deadline and a fresh cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach an externally owned cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Return true if waiting until `at` would pass the deadline.
    pub fn would_exceed_deadline(&self, at: Instant) -> bool {
        self.deadline.is_some_and(|deadline| at > deadline)
    }

    /// The error to fail with if the call is already over before it starts.
    pub fn check(&self) -> Result<(), CallError> {
        if self.cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(CallError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolve once the call is cancelled or its deadline passes.
    /// Never resolves for an uncancelled call without a deadline.
    pub async fn done(&self) -> CallError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => CallError::Cancelled,
            () = deadline => CallError::DeadlineExceeded,
        }
    }
}

/// Something that performs one outbound call.
pub trait Invoker<Req>: Send + Sync {
    type Response: Send;
    type Error: CallFailure + Send;

    fn invoke(
        &self,
        request: &Req,
        ctx: &CallContext,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}
