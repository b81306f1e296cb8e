//! Rebalance scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::load_balancer::registry::BalancerRegistry;

/// Predicate choosing which targets get rebalanced.
pub type TargetFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Rebalances the selected targets of a registry on a fixed interval.
pub struct RebalanceScheduler<H> {
    registry: Arc<BalancerRegistry<H>>,
    interval: Duration,
    filter: TargetFilter,
}

impl<H> RebalanceScheduler<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Scheduler covering every target of the registry.
    pub fn new(registry: Arc<BalancerRegistry<H>>, interval: Duration) -> Self {
        Self {
            registry,
            interval,
            filter: Arc::new(|_| true),
        }
    }

    /// Restrict rebalancing to targets matching `filter`.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(filter);
        self
    }

    /// Run until `shutdown` is cancelled. The first rebalance happens one
    /// interval after start.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(interval = ?self.interval, "Rebalance scheduler starting");

        // tokio rejects a zero period.
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let filter = self.filter.clone();
                    let count = self.registry.rebalance_where(|target| filter(target));
                    tracing::debug!(targets = count, "Rebalance tick");
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Rebalance scheduler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
