//! Metrics and observability
//!
//! Registry of named counters and gauges on top of the `prometheus` crate,
//! update handles that reject invalid updates, and an HTTP exposition
//! endpoint.

mod agent;
mod counters;
mod descriptor;
mod encoder;
mod exporter;
mod registry;

pub use agent::{AgentMetrics, RegenerationOutcome, NAMESPACE};
pub use counters::{Counter, CounterVec, Gauge, GaugeVec};
pub use descriptor::{MetricDescriptor, MetricKind};
pub use encoder::{encode, CONTENT_TYPE};
pub use exporter::{enable, BindAddress, ExporterHandle, METRICS_PATH};
pub use prometheus::proto::MetricFamily;
pub use registry::{MetricInstance, Registry};
