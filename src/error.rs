//! Error types
//!
//! Configuration errors (duplicate registration, bad names, label arity) are
//! programming mistakes and are expected to abort startup. Update errors are
//! returned to the caller and never touch other metrics.

use thiserror::Error;

/// Errors raised by the metrics registry, update API and exporter
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    /// A metric with the same fully-qualified name is already registered
    #[error("metric {0:?} is already registered")]
    AlreadyRegistered(String),

    /// Metric or label names rejected by the registry
    #[error("invalid descriptor for {metric:?}: {reason}")]
    InvalidDescriptor { metric: String, reason: String },

    /// Number of label values does not match the label schema
    #[error("metric {metric:?} expects {expected} label values, got {got}")]
    LabelArity {
        metric: String,
        expected: usize,
        got: usize,
    },

    /// Counter increments must be non-negative
    #[error("counter cannot be incremented by {0}")]
    NegativeIncrement(f64),

    /// Snapshot could not be rendered
    #[error("failed to encode metrics: {0}")]
    Encode(String),

    /// Bind address could not be parsed
    #[error("invalid bind address {addr:?}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// `enable` was called outside of a tokio runtime
    #[error("metrics exporter requires a running tokio runtime")]
    NoRuntime,
}

impl MetricsError {
    /// Translate a `prometheus` error raised while handling `metric`
    pub(crate) fn from_prometheus(err: prometheus::Error, metric: &str) -> Self {
        match err {
            prometheus::Error::AlreadyReg => MetricsError::AlreadyRegistered(metric.to_string()),
            prometheus::Error::InconsistentCardinality { expect, got } => MetricsError::LabelArity {
                metric: metric.to_string(),
                expected: expect,
                got,
            },
            other => MetricsError::InvalidDescriptor {
                metric: metric.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_prometheus() {
        assert_eq!(
            MetricsError::from_prometheus(prometheus::Error::AlreadyReg, "cilium_x"),
            MetricsError::AlreadyRegistered("cilium_x".into())
        );
        assert_eq!(
            MetricsError::from_prometheus(
                prometheus::Error::InconsistentCardinality { expect: 1, got: 2 },
                "cilium_x"
            ),
            MetricsError::LabelArity {
                metric: "cilium_x".into(),
                expected: 1,
                got: 2,
            }
        );
        assert!(matches!(
            MetricsError::from_prometheus(prometheus::Error::Msg("bad".into()), "cilium_x"),
            MetricsError::InvalidDescriptor { .. }
        ));
    }
}
