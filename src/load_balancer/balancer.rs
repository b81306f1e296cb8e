//! Per-target pinned balancer.
//!
//! # Responsibilities
//! - Own the connection inventory and failure clock of one target
//! - Re-rank after every mutation and publish the winner
//! - Serve lock-free reads of the published selection
//! - Shuffle tie-break orders on rebalance
//!
//! All mutations serialize on one `Mutex`. The published selection lives in
//! an `ArcSwapOption`, so readers never touch the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwapOption;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::load_balancer::address::Address;
use crate::load_balancer::inventory::Inventory;
use crate::load_balancer::picker::Picker;
use crate::load_balancer::selector;
use crate::observability::metrics;
use crate::resolver::AddressSink;

/// The connection currently pinned for a target. Immutable once published.
#[derive(Debug)]
pub struct PinnedSelection<H> {
    pub address: Address,
    pub handle: H,
}

/// Diagnostic view of one inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSnapshot {
    pub address: Address,
    pub order: u64,
    pub last_failure_tick: u64,
    pub ready: bool,
    pub pinned: bool,
}

#[derive(Debug)]
struct Inner<H> {
    target: String,
    inventory: Mutex<Inventory<H>>,
    pinned: ArcSwapOption<PinnedSelection<H>>,
    shuffler: Mutex<StdRng>,
}

/// Sticky balancer for a single target. Cheap to clone.
#[derive(Debug)]
pub struct PinnedBalancer<H> {
    inner: Arc<Inner<H>>,
}

impl<H> Clone for PinnedBalancer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H> PinnedBalancer<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Create a balancer with an entropy-seeded shuffler.
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_rng(target, StdRng::from_entropy())
    }

    /// Create a balancer whose rebalance permutations follow `seed`.
    pub fn with_seed(target: impl Into<String>, seed: u64) -> Self {
        Self::with_rng(target, StdRng::seed_from_u64(seed))
    }

    /// Create a balancer using the given random source for rebalancing.
    pub fn with_rng(target: impl Into<String>, rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Inner {
                target: target.into(),
                inventory: Mutex::new(Inventory::new()),
                pinned: ArcSwapOption::empty(),
                shuffler: Mutex::new(rng),
            }),
        }
    }

    /// Logical target this balancer serves.
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    /// Picker for the hot path.
    pub fn picker(&self) -> Picker<H> {
        Picker::new(self.clone())
    }

    /// The currently published selection, read without locking.
    pub fn pinned(&self) -> Option<Arc<PinnedSelection<H>>> {
        self.inner.pinned.load_full()
    }

    /// Forget every address not present in the latest full address list.
    pub fn reconcile(&self, addresses: &[Address]) {
        let mut inventory = self.lock();
        let removed = inventory.reconcile(addresses);
        if removed > 0 {
            tracing::debug!(
                target_name = %self.inner.target,
                removed,
                remaining = inventory.len(),
                "Forgot stale addresses"
            );
        }
        self.update_pinned_locked(&inventory);
    }

    /// Report a single address as ready on `handle`.
    pub fn mark_ready(&self, address: Address, handle: H) {
        let mut inventory = self.lock();
        if inventory.mark_ready(address.clone(), handle) {
            tracing::debug!(target_name = %self.inner.target, address = %address, "Tracking new connection");
        }
        self.update_pinned_locked(&inventory);
    }

    /// Report a single address as no longer ready.
    pub fn mark_not_ready(&self, address: &Address) {
        let mut inventory = self.lock();
        inventory.mark_not_ready(address);
        self.update_pinned_locked(&inventory);
    }

    /// Apply a complete readiness snapshot. Tracked addresses missing from it
    /// are marked not ready.
    pub fn update_readiness<I>(&self, ready: I)
    where
        I: IntoIterator<Item = (Address, H)>,
    {
        let mut inventory = self.lock();
        inventory.apply_ready_snapshot(ready);
        self.update_pinned_locked(&inventory);
    }

    /// Record a failed call against `address`. Untracked addresses are ignored.
    pub fn witness_failure(&self, address: &Address) {
        let mut inventory = self.lock();
        match inventory.witness_failure(address) {
            Some(tick) => {
                tracing::debug!(
                    target_name = %self.inner.target,
                    address = %address,
                    tick,
                    "Witnessed call failure"
                );
                metrics::record_failure_witnessed(&self.inner.target);
                self.update_pinned_locked(&inventory);
            }
            None => {
                tracing::debug!(
                    target_name = %self.inner.target,
                    address = %address,
                    "Ignoring failure for untracked address"
                );
            }
        }
    }

    /// Reassign tie-break orders following `permutation`.
    pub fn reorder_indices(&self, permutation: &[Address]) {
        let mut inventory = self.lock();
        inventory.reorder_indices(permutation);
        self.update_pinned_locked(&inventory);
    }

    /// Shuffle the tie-break order of all tracked addresses.
    pub fn rebalance(&self) {
        let mut inventory = self.lock();
        let mut addresses = inventory.addresses_by_order();
        {
            let mut rng = self
                .inner
                .shuffler
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            addresses.shuffle(&mut *rng);
        }
        inventory.reorder_indices(&addresses);

        tracing::info!(
            target_name = %self.inner.target,
            candidates = addresses.len(),
            "Rebalanced tie-break order"
        );
        metrics::record_rebalance(&self.inner.target);
        self.update_pinned_locked(&inventory);
    }

    /// Inventory records, best-ranked first.
    pub fn snapshot(&self) -> Vec<RecordSnapshot> {
        let inventory = self.lock();
        let pinned = self.pinned();
        selector::ranked(inventory.records())
            .into_iter()
            .map(|r| RecordSnapshot {
                address: r.address.clone(),
                order: r.order,
                last_failure_tick: r.last_failure_tick,
                ready: r.is_ready,
                pinned: pinned.as_ref().is_some_and(|p| p.address == r.address),
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inventory<H>> {
        self.inner
            .inventory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn update_pinned_locked(&self, inventory: &Inventory<H>) {
        let ready = inventory.records().filter(|r| r.is_ready).count();
        metrics::record_ready_candidates(&self.inner.target, ready);

        let previous_addr = self.inner.pinned.load_full().map(|p| p.address.clone());

        match selector::select_pinned(inventory.records()) {
            Some(winner) => {
                if previous_addr.as_ref() != Some(&winner.address) {
                    tracing::info!(
                        target_name = %self.inner.target,
                        address = %winner.address,
                        failure_tick = winner.last_failure_tick,
                        order = winner.order,
                        "Update pinned server"
                    );
                    metrics::record_pinned_change(&self.inner.target);
                }
                self.inner.pinned.store(Some(Arc::new(PinnedSelection {
                    address: winner.address.clone(),
                    handle: winner.handle.clone(),
                })));
            }
            None => {
                if let Some(addr) = previous_addr {
                    tracing::warn!(
                        target_name = %self.inner.target,
                        previous = %addr,
                        "No ready connection left to pin"
                    );
                    metrics::record_pinned_change(&self.inner.target);
                }
                self.inner.pinned.store(None);
            }
        }
    }
}

impl<H> AddressSink for PinnedBalancer<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn update_addresses(&self, addresses: &[Address]) {
        self.reconcile(addresses);
    }
}
