//! Metric registry
//!
//! Owns a `prometheus::Registry` for this process. Registration needs `&mut`
//! access and happens during startup; afterwards the registry is shared
//! behind an `Arc` and only metric values change.

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use tracing::debug;

use super::counters::{Counter, CounterVec, Gauge, GaugeVec};
use super::descriptor::{MetricDescriptor, MetricKind};
use crate::error::{MetricsError, Result};

/// Live handle to a registered metric
#[derive(Clone)]
pub enum MetricInstance {
    Counter(Counter),
    Gauge(Gauge),
    CounterVec(CounterVec),
    GaugeVec(GaugeVec),
}

/// Registry of every metric exposed by this process
pub struct Registry {
    namespace: String,
    inner: prometheus::Registry,
    families: usize,
}

impl Registry {
    /// Create an empty registry for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            inner: prometheus::Registry::new(),
            families: 0,
        }
    }

    /// Namespace prepended to every metric owned by this process
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register a descriptor and create its instance
    pub fn register(&mut self, descriptor: MetricDescriptor) -> Result<MetricInstance> {
        let instance = match (descriptor.kind, descriptor.is_labeled()) {
            (MetricKind::Counter, false) => {
                MetricInstance::Counter(self.counter_from(&descriptor)?)
            }
            (MetricKind::Gauge, false) => MetricInstance::Gauge(self.gauge_from(&descriptor)?),
            (MetricKind::Counter, true) => {
                MetricInstance::CounterVec(self.counter_vec_from(&descriptor)?)
            }
            (MetricKind::Gauge, true) => {
                MetricInstance::GaugeVec(self.gauge_vec_from(&descriptor)?)
            }
        };
        Ok(instance)
    }

    /// Register an unlabeled counter
    pub fn register_counter(&mut self, name: &str, help: &str) -> Result<Counter> {
        let desc = MetricDescriptor::counter(&self.namespace, name, help);
        self.counter_from(&desc)
    }

    /// Register an unlabeled gauge
    pub fn register_gauge(&mut self, name: &str, help: &str) -> Result<Gauge> {
        let desc = MetricDescriptor::gauge(&self.namespace, name, help);
        self.gauge_from(&desc)
    }

    /// Register a counter split by `labels`
    pub fn register_counter_vec(
        &mut self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<CounterVec> {
        let desc = MetricDescriptor::counter(&self.namespace, name, help).with_labels(labels);
        require_labels(&desc)?;
        self.counter_vec_from(&desc)
    }

    /// Register a gauge split by `labels`
    pub fn register_gauge_vec(
        &mut self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<GaugeVec> {
        let desc = MetricDescriptor::gauge(&self.namespace, name, help).with_labels(labels);
        require_labels(&desc)?;
        self.gauge_vec_from(&desc)
    }

    /// Register a scrape-time collector
    pub fn register_collector(&mut self, collector: Box<dyn Collector>) -> Result<()> {
        let names: Vec<String> = collector.desc().iter().map(|d| d.fq_name.clone()).collect();
        let label = names.first().cloned().unwrap_or_default();

        self.inner
            .register(collector)
            .map_err(|e| MetricsError::from_prometheus(e, &label))?;

        self.families += names.len();
        debug!(metrics = ?names, "Registered collector");
        Ok(())
    }

    /// Register the process self-metrics under this registry's namespace
    ///
    /// Process metrics are read from procfs, so only Linux reports them.
    #[cfg(target_os = "linux")]
    pub fn register_process_collector(&mut self) -> Result<()> {
        use prometheus::process_collector::ProcessCollector;

        let pid = std::process::id() as i32;
        let collector = ProcessCollector::new(pid, self.namespace.clone());
        self.register_collector(Box::new(collector))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn register_process_collector(&mut self) -> Result<()> {
        debug!("Process metrics are only collected on Linux");
        Ok(())
    }

    fn counter_from(&mut self, desc: &MetricDescriptor) -> Result<Counter> {
        let counter = prometheus::Counter::with_opts(desc.opts()).map_err(|e| invalid(e, desc))?;
        self.add(desc, Box::new(counter.clone()))?;
        Ok(Counter::new(counter))
    }

    fn gauge_from(&mut self, desc: &MetricDescriptor) -> Result<Gauge> {
        let gauge = Gauge::with_opts(desc.opts()).map_err(|e| invalid(e, desc))?;
        self.add(desc, Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    fn counter_vec_from(&mut self, desc: &MetricDescriptor) -> Result<CounterVec> {
        let vec = prometheus::CounterVec::new(desc.opts(), &desc.label_refs())
            .map_err(|e| invalid(e, desc))?;
        self.add(desc, Box::new(vec.clone()))?;
        Ok(CounterVec::new(vec))
    }

    fn gauge_vec_from(&mut self, desc: &MetricDescriptor) -> Result<GaugeVec> {
        let vec = prometheus::GaugeVec::new(desc.opts(), &desc.label_refs())
            .map_err(|e| invalid(e, desc))?;
        self.add(desc, Box::new(vec.clone()))?;
        Ok(GaugeVec::new(vec))
    }

    fn add(&mut self, desc: &MetricDescriptor, collector: Box<dyn Collector>) -> Result<()> {
        let name = desc.full_name();
        self.inner
            .register(collector)
            .map_err(|e| MetricsError::from_prometheus(e, &name))?;

        self.families += 1;
        debug!(
            metric = %name,
            kind = %desc.kind,
            labels = ?desc.label_names,
            "Registered metric"
        );
        Ok(())
    }

    /// Number of registered metric families
    pub fn len(&self) -> usize {
        self.families
    }

    pub fn is_empty(&self) -> bool {
        self.families == 0
    }

    /// Current value of every metric, sorted by fully-qualified name
    ///
    /// Each value is read atomically; the snapshot as a whole is not a single
    /// transaction. Labeled families with no series yet are left out.
    pub fn snapshot(&self) -> Vec<MetricFamily> {
        self.inner.gather()
    }
}

/// Constructor errors are about the descriptor, never about registration
fn invalid(err: prometheus::Error, desc: &MetricDescriptor) -> MetricsError {
    MetricsError::InvalidDescriptor {
        metric: desc.full_name(),
        reason: err.to_string(),
    }
}

fn require_labels(desc: &MetricDescriptor) -> Result<()> {
    if desc.is_labeled() {
        return Ok(());
    }
    Err(MetricsError::LabelArity {
        metric: desc.full_name(),
        expected: 1,
        got: 0,
    })
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", &self.namespace)
            .field("metrics", &self.families)
            .finish()
    }
}
