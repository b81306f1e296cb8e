//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BalancerConfig {
    /// Retry wrapper settings.
    pub retries: RetryConfig,

    /// Periodic rebalancing settings.
    pub rebalance: RebalanceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Statically configured targets and their addresses.
    pub targets: Vec<TargetConfig>,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 1000,
        }
    }
}

/// Rebalance configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Run the periodic rebalancer.
    pub enabled: bool,

    /// Interval between rebalances in seconds.
    pub interval_secs: u64,

    /// Seed for the tie-break shuffler. Entropy-seeded when absent.
    pub seed: Option<u64>,

    /// Only rebalance targets whose name ends with one of these suffixes.
    /// Empty means every target.
    pub target_suffixes: Vec<String>,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 60,
            seed: None,
            target_suffixes: Vec::new(),
        }
    }
}

impl RebalanceConfig {
    /// Return true if `target` is selected for rebalancing.
    pub fn matches(&self, target: &str) -> bool {
        self.target_suffixes.is_empty()
            || self.target_suffixes.iter().any(|s| target.ends_with(s.as_str()))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A logical target and its candidate addresses.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// Target name (e.g. "server.dc1").
    pub name: String,

    /// Candidate server addresses.
    pub addresses: Vec<String>,
}
