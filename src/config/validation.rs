//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, interval > 0)
//! - Detect duplicate targets and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("retries.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("rebalance.interval_secs must be positive when rebalancing is enabled")]
    ZeroRebalanceInterval,

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),

    #[error("target name must not be empty")]
    EmptyTargetName,

    #[error("duplicate target '{0}'")]
    DuplicateTarget(String),

    #[error("target '{0}' has no addresses")]
    NoAddresses(String),

    #[error("target '{target}' lists address '{address}' more than once")]
    DuplicateAddress { target: String, address: String },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }

    if config.rebalance.enabled && config.rebalance.interval_secs == 0 {
        errors.push(ValidationError::ZeroRebalanceInterval);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut names = HashSet::new();
    for target in &config.targets {
        if target.name.is_empty() {
            errors.push(ValidationError::EmptyTargetName);
        } else if !names.insert(target.name.as_str()) {
            errors.push(ValidationError::DuplicateTarget(target.name.clone()));
        }

        if target.addresses.is_empty() {
            errors.push(ValidationError::NoAddresses(target.name.clone()));
        }

        let mut seen = HashSet::new();
        for address in &target.addresses {
            if !seen.insert(address.as_str()) {
                errors.push(ValidationError::DuplicateAddress {
                    target: target.name.clone(),
                    address: address.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
