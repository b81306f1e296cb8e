//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → retry policy, rebalance schedule, demo targets, observability
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Defaults reproduce the reference retry behavior (5 attempts, 1s apart)
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BalancerConfig;
pub use schema::ObservabilityConfig;
pub use schema::RebalanceConfig;
pub use schema::RetryConfig;
pub use schema::TargetConfig;
