//! Pinned connection ranking.
//!
//! Among ready records the winner is the smallest `(last_failure_tick, order)`
//! pair. Never-failed records (tick 0) beat any failed one; among failed ones
//! the record that failed longest ago wins. `order` is unique, so there are
//! no ties.

use crate::load_balancer::inventory::ConnectionRecord;

/// Sort key for a record.
pub fn rank_key<H>(record: &ConnectionRecord<H>) -> (u64, u64) {
    (record.last_failure_tick, record.order)
}

/// Select the record to pin, or None if nothing is ready.
pub fn select_pinned<'a, H, I>(records: I) -> Option<&'a ConnectionRecord<H>>
where
    H: 'a,
    I: IntoIterator<Item = &'a ConnectionRecord<H>>,
{
    records
        .into_iter()
        .filter(|r| r.is_ready)
        .min_by_key(|r| rank_key(r))
}

/// All records sorted best-first, ready records ahead of not-ready ones.
pub fn ranked<'a, H, I>(records: I) -> Vec<&'a ConnectionRecord<H>>
where
    H: 'a,
    I: IntoIterator<Item = &'a ConnectionRecord<H>>,
{
    let mut all: Vec<_> = records.into_iter().collect();
    all.sort_by_key(|r| (!r.is_ready, rank_key(r)));
    all
}
