//! Resolver serving a fixed, manually replaced address list.

use std::sync::{Arc, Mutex, PoisonError};

use crate::load_balancer::address::Address;
use crate::resolver::AddressSink;

#[derive(Default)]
struct State {
    addresses: Vec<Address>,
    sinks: Vec<Arc<dyn AddressSink>>,
}

/// Pushes a static address list to its subscribers.
#[derive(Default)]
pub struct StaticResolver {
    state: Mutex<State>,
}

impl StaticResolver {
    pub fn new<I, A>(addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        Self {
            state: Mutex::new(State {
                addresses: addresses.into_iter().map(Into::into).collect(),
                sinks: Vec::new(),
            }),
        }
    }

    /// Register a sink and push the current list to it.
    pub fn subscribe(&self, sink: Arc<dyn AddressSink>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        sink.update_addresses(&state.addresses);
        state.sinks.push(sink);
    }

    /// Replace the address list and push it to every subscriber.
    pub fn set_addresses<I, A>(&self, addresses: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.addresses = addresses.into_iter().map(Into::into).collect();

        tracing::info!(
            addresses = state.addresses.len(),
            subscribers = state.sinks.len(),
            "Publishing address list"
        );
        for sink in &state.sinks {
            sink.update_addresses(&state.addresses);
        }
    }

    /// Current address list.
    pub fn addresses(&self) -> Vec<Address> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .addresses
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::balancer::PinnedBalancer;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Vec<Address>>>,
    }

    impl AddressSink for Recorder {
        fn update_addresses(&self, addresses: &[Address]) {
            self.seen.lock().unwrap().push(addresses.to_vec());
        }
    }

    #[test]
    fn test_subscriber_gets_current_and_later_lists() {
        let resolver = StaticResolver::new(["a", "b"]);
        let recorder = Arc::new(Recorder::default());
        resolver.subscribe(recorder.clone());
        resolver.set_addresses(["a"]);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], vec![Address::new("a"), Address::new("b")]);
        assert_eq!(seen[1], vec![Address::new("a")]);
        assert_eq!(resolver.addresses(), vec![Address::new("a")]);
    }

    #[test]
    fn test_balancer_forgets_dropped_address() {
        let lb = PinnedBalancer::with_seed("svc", 1);
        lb.mark_ready(Address::new("a"), 1u32);
        lb.mark_ready(Address::new("b"), 2u32);

        let resolver = StaticResolver::new(["a", "b"]);
        resolver.subscribe(Arc::new(lb.clone()));
        resolver.set_addresses(["b"]);

        assert_eq!(lb.pinned().unwrap().address.as_str(), "b");
        assert_eq!(lb.snapshot().len(), 1);
    }
}
