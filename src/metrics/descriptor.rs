//! Metric descriptors
//!
//! Static description of a measurement: namespace, name, help text, kind and
//! label schema. The fully-qualified name is `<namespace>_<name>` and is the
//! identity used by the registry.

use std::fmt;

use prometheus::Opts;

/// Kind of measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonically non-decreasing value
    Counter,
    /// Value that can go up and down
    Gauge,
}

impl MetricKind {
    /// Name used on `# TYPE` lines
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of a single metric family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub namespace: String,
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

impl MetricDescriptor {
    /// Create an unlabeled descriptor
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            help: help.into(),
            kind,
            label_names: Vec::new(),
        }
    }

    /// Shorthand for a counter descriptor
    pub fn counter(namespace: &str, name: &str, help: &str) -> Self {
        Self::new(namespace, name, help, MetricKind::Counter)
    }

    /// Shorthand for a gauge descriptor
    pub fn gauge(namespace: &str, name: &str, help: &str) -> Self {
        Self::new(namespace, name, help, MetricKind::Gauge)
    }

    /// Attach an ordered label schema
    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.label_names = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Fully-qualified name, e.g. `cilium_endpoint_count`
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}", self.namespace, self.name)
        }
    }

    /// Whether this descriptor has a label schema
    pub fn is_labeled(&self) -> bool {
        !self.label_names.is_empty()
    }

    /// Label schema as borrowed strs, the shape vec constructors take
    pub(crate) fn label_refs(&self) -> Vec<&str> {
        self.label_names.iter().map(String::as_str).collect()
    }

    /// Options for the `prometheus` metric constructors
    pub(crate) fn opts(&self) -> Opts {
        Opts::new(self.name.clone(), self.help.clone()).namespace(self.namespace.clone())
    }
}
