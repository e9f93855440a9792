//! Agent metrics - registry and Prometheus exposition endpoint
//!
//! Defines the agent's fixed catalog of counters and gauges, aggregates
//! updates from any thread, and serves the current values over HTTP in the
//! Prometheus text format.

pub mod config;
pub mod error;
pub mod metrics;
pub mod util;

pub use config::Config;
pub use error::MetricsError;
pub use metrics::{AgentMetrics, Registry};

/// Crate version for display
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
