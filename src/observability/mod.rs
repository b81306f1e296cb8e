//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Balancers, picker, retry wrapper produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout log stream
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (target, address, attempt) on every event
//! - Metric updates go through the `metrics` facade and are no-ops until a
//!   recorder is installed

pub mod logging;
pub mod metrics;
