//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → retries.rs (attempt; on overload wait and retry, up to max_attempts)
//!     → BalancedInvoker (pick → transport → completion hook)
//!     → final failure already reported to the inventory by the hook
//! ```

pub mod retries;

pub use retries::{with_retry, RetryPolicy, Retrying};
