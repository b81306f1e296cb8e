//! Hot-path picker.
//!
//! `pick()` is a single atomic load of the published selection. The returned
//! [`DoneHook`] reports exactly once, always against the address that served
//! the call: through `complete`, or as a failure when it is dropped unreported
//! (the caller abandoned the call mid-flight).

use std::sync::Arc;

use crate::error::{BalancerError, Outcome};
use crate::load_balancer::address::Address;
use crate::load_balancer::balancer::{PinnedBalancer, PinnedSelection};
use crate::observability::metrics;

/// Reads the pinned connection of one target.
#[derive(Debug)]
pub struct Picker<H> {
    balancer: PinnedBalancer<H>,
}

impl<H> Clone for Picker<H> {
    fn clone(&self) -> Self {
        Self {
            balancer: self.balancer.clone(),
        }
    }
}

impl<H> Picker<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(balancer: PinnedBalancer<H>) -> Self {
        Self { balancer }
    }

    /// Return the pinned connection for the next call.
    pub fn pick(&self) -> Result<Pick<H>, BalancerError> {
        match self.balancer.pinned() {
            Some(selection) => {
                let done = DoneHook {
                    balancer: self.balancer.clone(),
                    address: selection.address.clone(),
                    reported: false,
                };
                Ok(Pick { selection, done })
            }
            None => {
                metrics::record_unavailable(self.balancer.target());
                Err(BalancerError::Unavailable {
                    target: self.balancer.target().to_string(),
                })
            }
        }
    }
}

/// Result of a successful pick.
#[derive(Debug)]
#[must_use = "the call outcome must be reported with `complete`"]
pub struct Pick<H>
where
    H: Clone + Send + Sync + 'static,
{
    selection: Arc<PinnedSelection<H>>,
    done: DoneHook<H>,
}

impl<H> Pick<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Connection handle to send the call on.
    pub fn handle(&self) -> &H {
        &self.selection.handle
    }

    /// Address of the picked connection.
    pub fn address(&self) -> &Address {
        &self.selection.address
    }

    /// Split into the selection and its completion hook.
    pub fn into_parts(self) -> (Arc<PinnedSelection<H>>, DoneHook<H>) {
        (self.selection, self.done)
    }

    /// Report the call outcome.
    pub fn complete(self, outcome: Outcome) {
        self.done.complete(outcome);
    }
}

/// Completion callback bound to the address captured at pick time.
#[derive(Debug)]
#[must_use = "the call outcome must be reported with `complete`"]
pub struct DoneHook<H>
where
    H: Clone + Send + Sync + 'static,
{
    balancer: PinnedBalancer<H>,
    address: Address,
    reported: bool,
}

impl<H> DoneHook<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Feed the call outcome back into the inventory.
    pub fn complete(mut self, outcome: Outcome) {
        self.report(outcome);
    }

    fn report(&mut self, outcome: Outcome) {
        if self.reported {
            return;
        }
        self.reported = true;
        if outcome.is_failure() {
            self.balancer.witness_failure(&self.address);
        }
    }
}

impl<H> Drop for DoneHook<H>
where
    H: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.reported {
            tracing::debug!(
                target_name = %self.balancer.target(),
                address = %self.address,
                "Call abandoned before completion"
            );
            self.report(Outcome::Failure);
        }
    }
}
