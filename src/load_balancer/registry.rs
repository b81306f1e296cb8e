//! Balancer registry.
//!
//! # Responsibilities
//! - Hand out exactly one balancer per target
//! - Rebalance the targets chosen by a caller-supplied predicate
//!
//! The registry is an explicit value owned by the caller; nothing is global.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::load_balancer::balancer::PinnedBalancer;

/// Factory and index of per-target balancers.
#[derive(Debug)]
pub struct BalancerRegistry<H> {
    by_target: Mutex<HashMap<String, PinnedBalancer<H>>>,
    seeder: Mutex<StdRng>,
}

impl<H> BalancerRegistry<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Registry whose balancers are entropy-seeded.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Registry whose balancers derive their shuffle seeds from `seed`, in
    /// order of creation.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(seeder: StdRng) -> Self {
        Self {
            by_target: Mutex::new(HashMap::new()),
            seeder: Mutex::new(seeder),
        }
    }

    /// Return the balancer for `target`, creating it on first use.
    pub fn balancer_for(&self, target: &str) -> PinnedBalancer<H> {
        let mut by_target = self.lock();
        if let Some(balancer) = by_target.get(target) {
            return balancer.clone();
        }

        let seed = self
            .seeder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<u64>();
        let balancer = PinnedBalancer::with_seed(target, seed);
        by_target.insert(target.to_string(), balancer.clone());
        tracing::debug!(target_name = %target, "Created balancer");
        balancer
    }

    /// Look up an existing balancer.
    pub fn get(&self, target: &str) -> Option<PinnedBalancer<H>> {
        self.lock().get(target).cloned()
    }

    /// Stop tracking `target`. Existing clones keep working.
    pub fn remove(&self, target: &str) -> Option<PinnedBalancer<H>> {
        self.lock().remove(target)
    }

    /// Registered target names, sorted.
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.lock().keys().cloned().collect();
        targets.sort();
        targets
    }

    /// Rebalance every target whose name satisfies `filter`.
    /// Returns the number of targets rebalanced.
    pub fn rebalance_where<F>(&self, filter: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let selected: Vec<PinnedBalancer<H>> = self
            .lock()
            .iter()
            .filter(|(target, _)| filter(target.as_str()))
            .map(|(_, balancer)| balancer.clone())
            .collect();

        for balancer in &selected {
            balancer.rebalance();
        }
        selected.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PinnedBalancer<H>>> {
        self.by_target.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H> Default for BalancerRegistry<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
