//! Prometheus text exposition format
//!
//! Rendering is done by `prometheus::TextEncoder`: one `# HELP` and one
//! `# TYPE` line per family, then one line per series, with help text and
//! label values escaped.

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};

use crate::error::{MetricsError, Result};

/// Content type of the rendered body, `text/plain; version=0.0.4`
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Render a snapshot to text
pub fn encode(families: &[MetricFamily]) -> Result<String> {
    let mut buffer = Vec::with_capacity(families.len() * 128);
    TextEncoder::new()
        .encode(families, &mut buffer)
        .map_err(|e| MetricsError::Encode(e.to_string()))?;

    String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
}
