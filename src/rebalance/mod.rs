//! Periodic rebalancing.
//!
//! # Data Flow
//! ```text
//! Interval tick
//!     → TargetFilter picks targets
//!     → BalancerRegistry::rebalance_where
//!     → each PinnedBalancer shuffles tie-break orders and re-pins
//! ```
//!
//! # Design Decisions
//! - Which targets to rebalance is a caller-supplied predicate
//! - Failed connections keep their rank; only never-failed ones are reshuffled
//! - The scheduler stops when its cancellation token fires

pub mod scheduler;

pub use scheduler::{RebalanceScheduler, TargetFilter};
