//! Pinned (sticky) load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Address feed → balancer.rs reconcile (forget dropped addresses)
//! Readiness    → balancer.rs mark_ready / update_readiness
//!     → inventory.rs (records, failure clock)
//!     → selector.rs (min (failure tick, order) among ready)
//!     → published PinnedSelection (ArcSwapOption)
//!     → picker.rs pick() → call → DoneHook::complete(outcome)
//!     → inventory.rs witness_failure → re-rank → republish
//! ```
//!
//! # Design Decisions
//! - 100% of a target's traffic goes to one connection until it fails
//! - Never-failed connections outrank failed ones; among failed, the oldest failure wins
//! - Mutations serialize on one lock per target; pick() never takes it
//! - One balancer per target, handed out by an explicit registry

pub mod address;
pub mod balancer;
pub mod channel;
pub mod inventory;
pub mod picker;
pub mod registry;
pub mod selector;

pub use address::Address;
pub use balancer::{PinnedBalancer, PinnedSelection, RecordSnapshot};
pub use channel::{BalancedInvoker, Transport};
pub use picker::{DoneHook, Pick, Picker};
pub use registry::BalancerRegistry;
