//! Error types shared across the balancer and the retry wrapper.

use thiserror::Error;

/// Errors surfaced by the pinned selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalancerError {
    /// No ready connection is currently pinned for the target.
    #[error("no ready connection available for target {target}")]
    Unavailable { target: String },
}

/// Failure of a single outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The balancer had nothing to route to.
    #[error(transparent)]
    Unavailable(#[from] BalancerError),

    /// The server is shedding load (resource exhausted).
    #[error("server overloaded: {0}")]
    Overloaded(String),

    /// The caller cancelled the call.
    #[error("call cancelled")]
    Cancelled,

    /// The call deadline passed before a response arrived.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Any other call failure.
    #[error("call failed: {0}")]
    Failed(String),
}

/// Classification of a call failure for the retry wrapper.
pub trait CallFailure {
    /// Return true if the server signalled overload / resource exhaustion.
    fn is_overload(&self) -> bool;
}

impl CallFailure for CallError {
    fn is_overload(&self) -> bool {
        matches!(self, CallError::Overloaded(_))
    }
}

/// Outcome of a finished call, as reported to the completion hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Overload,
    Failure,
}

impl Outcome {
    /// Derive the outcome from a call result.
    pub fn from_result<T, E: CallFailure>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) if e.is_overload() => Outcome::Overload,
            Err(_) => Outcome::Failure,
        }
    }

    /// Return true if the outcome should count against the connection.
    pub fn is_failure(self) -> bool {
        !matches!(self, Outcome::Success)
    }
}
