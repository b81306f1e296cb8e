//! Client-side pinned connection selection with overload retries.

pub mod config;
pub mod error;
pub mod invoke;
pub mod load_balancer;
pub mod observability;
pub mod rebalance;
pub mod resilience;
pub mod resolver;

pub use config::BalancerConfig;
pub use error::{BalancerError, CallError, Outcome};
pub use invoke::{CallContext, Invoker};
pub use load_balancer::{Address, BalancerRegistry, PinnedBalancer};
pub use resilience::{RetryPolicy, Retrying};
