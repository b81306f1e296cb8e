//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use pinned_balancer::error::CallError;
use pinned_balancer::invoke::CallContext;
use pinned_balancer::load_balancer::Transport;

/// How a scripted server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Behavior {
    Healthy,
    Overloaded,
    Broken,
    /// Accepts the call and never answers.
    Hanging,
}

/// In-memory transport whose handles are server names. Each server's
/// behavior can be changed while the test runs; every call is counted.
#[derive(Default)]
pub struct ScriptedTransport {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<HashMap<String, u32>>,
    total: AtomicU32,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, server: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(server.to_string(), behavior);
    }

    pub fn calls_to(&self, server: &str) -> u32 {
        self.calls.lock().unwrap().get(server).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }
}

impl Transport<String, &'static str> for &ScriptedTransport {
    type Response = String;

    async fn call(
        &self,
        server: &String,
        request: &&'static str,
        _ctx: &CallContext,
    ) -> Result<String, CallError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(server.clone()).or_default() += 1;

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(server)
            .copied()
            .unwrap_or(Behavior::Healthy);

        match behavior {
            Behavior::Healthy => Ok(format!("{server}: {request}")),
            Behavior::Overloaded => Err(CallError::Overloaded(format!("{server} overloaded"))),
            Behavior::Broken => Err(CallError::Failed(format!("{server} reset"))),
            Behavior::Hanging => std::future::pending().await,
        }
    }
}
