//! Connection inventory.
//!
//! # Responsibilities
//! - Track one record per known address (readiness, tie-break order, failure tick)
//! - Forget addresses dropped by the address feed
//! - Stamp failures with the per-target failure clock
//!
//! The inventory itself is not synchronized; the owning balancer guards it
//! with a single exclusive lock per target.

use std::collections::HashMap;

use crate::load_balancer::address::Address;

/// Per-target monotonic failure counter. Zero means "never failed".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailureClock(u64);

impl FailureClock {
    /// Advance the clock and return the new value.
    pub fn tick(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// Current clock value.
    pub fn now(&self) -> u64 {
        self.0
    }
}

/// State tracked for a single candidate connection.
#[derive(Debug, Clone)]
pub struct ConnectionRecord<H> {
    pub address: Address,
    pub handle: H,
    /// Tie-break rank among never-failed candidates. Unique per inventory.
    pub order: u64,
    /// Failure clock value at the last witnessed failure, 0 if none.
    pub last_failure_tick: u64,
    pub is_ready: bool,
}

/// Address-keyed set of connection records for one target.
#[derive(Debug)]
pub struct Inventory<H> {
    records: HashMap<Address, ConnectionRecord<H>>,
    next_order: u64,
    clock: FailureClock,
}

impl<H> Default for Inventory<H> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            next_order: 0,
            clock: FailureClock::default(),
        }
    }
}

impl<H: Clone> Inventory<H> {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every record whose address is absent from `addresses`.
    /// Returns the number of records removed.
    pub fn reconcile(&mut self, addresses: &[Address]) -> usize {
        let before = self.records.len();
        self.records.retain(|addr, _| addresses.contains(addr));
        before - self.records.len()
    }

    /// Mark `address` ready, creating its record if needed.
    /// Returns true if a new record was created.
    pub fn mark_ready(&mut self, address: Address, handle: H) -> bool {
        if let Some(record) = self.records.get_mut(&address) {
            record.is_ready = true;
            record.handle = handle;
            return false;
        }

        let order = self.next_order;
        self.next_order += 1;
        self.records.insert(
            address.clone(),
            ConnectionRecord {
                address,
                handle,
                order,
                last_failure_tick: 0,
                is_ready: true,
            },
        );
        true
    }

    /// Mark `address` not ready. Returns false if the address is untracked.
    pub fn mark_not_ready(&mut self, address: &Address) -> bool {
        match self.records.get_mut(address) {
            Some(record) => {
                record.is_ready = false;
                true
            }
            None => false,
        }
    }

    /// Apply a complete readiness snapshot: listed addresses become ready,
    /// every other tracked address becomes not ready.
    pub fn apply_ready_snapshot<I>(&mut self, ready: I)
    where
        I: IntoIterator<Item = (Address, H)>,
    {
        let mut seen = Vec::new();
        for (address, handle) in ready {
            seen.push(address.clone());
            self.mark_ready(address, handle);
        }

        for record in self.records.values_mut() {
            if !seen.contains(&record.address) {
                record.is_ready = false;
            }
        }
    }

    /// Record a failure against `address`.
    /// Returns the new failure tick, or None if the address is untracked.
    pub fn witness_failure(&mut self, address: &Address) -> Option<u64> {
        let record = self.records.get_mut(address)?;
        let tick = self.clock.tick();
        record.last_failure_tick = tick;
        Some(tick)
    }

    /// Reassign tie-break orders following `permutation`.
    ///
    /// Tracked addresses take the order of their position in `permutation`;
    /// untracked entries are skipped and tracked addresses missing from it are
    /// placed after, keeping their relative order.
    pub fn reorder_indices(&mut self, permutation: &[Address]) {
        let mut order = 0;
        let mut assigned = Vec::with_capacity(self.records.len());

        for address in permutation {
            if assigned.contains(address) {
                continue;
            }
            if let Some(record) = self.records.get_mut(address) {
                record.order = order;
                order += 1;
                assigned.push(address.clone());
            }
        }

        let mut rest: Vec<&mut ConnectionRecord<H>> = self
            .records
            .values_mut()
            .filter(|r| !assigned.contains(&r.address))
            .collect();
        rest.sort_by_key(|r| r.order);
        for record in rest {
            record.order = order;
            order += 1;
        }

        self.next_order = order;
    }

    /// Tracked addresses sorted by their current order.
    pub fn addresses_by_order(&self) -> Vec<Address> {
        let mut records: Vec<&ConnectionRecord<H>> = self.records.values().collect();
        records.sort_by_key(|r| r.order);
        records.into_iter().map(|r| r.address.clone()).collect()
    }

    /// Look up a record.
    pub fn get(&self, address: &Address) -> Option<&ConnectionRecord<H>> {
        self.records.get(address)
    }

    /// Iterate over all records in unspecified order.
    pub fn records(&self) -> impl Iterator<Item = &ConnectionRecord<H>> {
        self.records.values()
    }

    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return true if no address is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current value of the failure clock.
    pub fn clock(&self) -> FailureClock {
        self.clock
    }
}
