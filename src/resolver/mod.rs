//! Address resolution feed.
//!
//! # Data Flow
//! ```text
//! StaticResolver::set_addresses(full list)
//!     → every subscribed AddressSink::update_addresses(full list)
//!         → connection manager (mark new addresses ready)
//!         → PinnedBalancer::reconcile (forget dropped addresses)
//! ```
//!
//! # Design Decisions
//! - Every update is a complete snapshot; there is no add/remove delta protocol
//! - New subscribers receive the current list immediately

pub mod static_list;

use crate::load_balancer::address::Address;

/// Consumer of full address-list updates.
pub trait AddressSink: Send + Sync {
    fn update_addresses(&self, addresses: &[Address]);
}

pub use static_list::StaticResolver;
