//! Counter and gauge handles
//!
//! Thin wrappers over the `prometheus` metric types. Values live in atomic
//! cells inside the crate, so updates from any thread never lose deltas.
//! The wrappers turn invalid updates (negative counter deltas, wrong label
//! arity) into errors instead of debug assertions or panics.

use prometheus::core::Collector;

use crate::error::{MetricsError, Result};

pub use prometheus::Gauge;

fn check_delta(delta: f64) -> Result<()> {
    if delta.is_nan() || delta < 0.0 {
        return Err(MetricsError::NegativeIncrement(delta));
    }
    Ok(())
}

/// Fully-qualified name of a single-descriptor collector, for error messages
fn metric_name(collector: &dyn Collector) -> String {
    collector
        .desc()
        .first()
        .map(|d| d.fq_name.clone())
        .unwrap_or_default()
}

/// Cumulative count of events
#[derive(Clone)]
pub struct Counter {
    inner: prometheus::Counter,
}

impl Counter {
    pub(crate) fn new(inner: prometheus::Counter) -> Self {
        Self { inner }
    }

    /// Increment by one
    #[inline]
    pub fn inc(&self) {
        self.inner.inc();
    }

    /// Increment by a non-negative delta
    pub fn inc_by(&self, delta: f64) -> Result<()> {
        check_delta(delta)?;
        self.inner.inc_by(delta);
        Ok(())
    }

    /// Current value
    pub fn get(&self) -> f64 {
        self.inner.get()
    }
}

/// Counter split by label values
///
/// Children are created on first use of a label combination; two callers
/// racing on the same new combination share one child.
#[derive(Clone)]
pub struct CounterVec {
    inner: prometheus::CounterVec,
}

impl CounterVec {
    pub(crate) fn new(inner: prometheus::CounterVec) -> Self {
        Self { inner }
    }

    /// Get or create the child for a label combination
    pub fn with_label_values(&self, values: &[&str]) -> Result<Counter> {
        self.inner
            .get_metric_with_label_values(values)
            .map(Counter::new)
            .map_err(|e| MetricsError::from_prometheus(e, &metric_name(&self.inner)))
    }

    /// Increment the child for `values` by one
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.inc();
        Ok(())
    }

    /// Increment the child for `values` by a non-negative delta
    pub fn inc_by(&self, delta: f64, values: &[&str]) -> Result<()> {
        // checked first so a bad delta creates no child
        check_delta(delta)?;
        self.with_label_values(values)?.inc_by(delta)
    }
}

/// Gauge split by label values
#[derive(Clone)]
pub struct GaugeVec {
    inner: prometheus::GaugeVec,
}

impl GaugeVec {
    pub(crate) fn new(inner: prometheus::GaugeVec) -> Self {
        Self { inner }
    }

    /// Get or create the child for a label combination
    pub fn with_label_values(&self, values: &[&str]) -> Result<Gauge> {
        self.inner
            .get_metric_with_label_values(values)
            .map_err(|e| MetricsError::from_prometheus(e, &metric_name(&self.inner)))
    }

    pub fn set(&self, value: f64, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.set(value);
        Ok(())
    }

    pub fn add(&self, delta: f64, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.add(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Opts;
    use std::sync::Arc;
    use std::thread;

    fn counter() -> Counter {
        Counter::new(prometheus::Counter::with_opts(Opts::new("c", "help")).unwrap())
    }

    fn counter_vec() -> CounterVec {
        let opts = Opts::new("endpoint_regenerations", "help").namespace("cilium");
        CounterVec::new(prometheus::CounterVec::new(opts, &["outcome"]).unwrap())
    }

    fn children(vec: &CounterVec) -> usize {
        vec.inner.collect().iter().map(|mf| mf.get_metric().len()).sum()
    }

    #[test]
    fn test_counter_increments() {
        let counter = counter();
        counter.inc();
        counter.inc_by(2.5).unwrap();
        assert_eq!(counter.get(), 3.5);
    }

    #[test]
    fn test_counter_rejects_negative_and_nan() {
        let counter = counter();
        counter.inc();
        assert_eq!(counter.inc_by(-1.0), Err(MetricsError::NegativeIncrement(-1.0)));
        assert!(counter.inc_by(f64::NAN).is_err());
        assert_eq!(counter.get(), 1.0);
    }

    #[test]
    fn test_gauge_operations() {
        let gauge = Gauge::new("g", "help").unwrap();
        gauge.set(10.0);
        gauge.inc();
        gauge.dec();
        gauge.dec();
        gauge.add(0.5);
        gauge.sub(3.0);
        assert_eq!(gauge.get(), 6.5);
    }

    #[test]
    fn test_concurrent_counter_no_lost_updates() {
        let counter = Arc::new(counter());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        counter.inc();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(), 80_000.0);
    }

    #[test]
    fn test_concurrent_gauge_sum_of_deltas() {
        let gauge = Gauge::new("g", "help").unwrap();
        gauge.set(100.0);
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gauge = gauge.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        if i % 2 == 0 {
                            gauge.add(3.0);
                        } else {
                            gauge.sub(1.0);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 2 threads * 1000 * 3 - 2 threads * 1000 * 1
        assert_eq!(gauge.get(), 4_100.0);
    }

    #[test]
    fn test_vec_label_arity() {
        let vec = counter_vec();
        let err = vec.inc(&["success", "extra"]).unwrap_err();
        assert_eq!(
            err,
            MetricsError::LabelArity {
                metric: "cilium_endpoint_regenerations".into(),
                expected: 1,
                got: 2,
            }
        );
        assert_eq!(children(&vec), 0);
    }

    #[test]
    fn test_vec_negative_delta_creates_no_child() {
        let vec = counter_vec();
        assert!(vec.inc_by(-2.0, &["x"]).is_err());
        assert_eq!(children(&vec), 0);
    }

    #[test]
    fn test_vec_children_are_independent() {
        let vec = counter_vec();
        vec.inc(&["success"]).unwrap();
        vec.inc(&["success"]).unwrap();
        vec.inc(&["fail"]).unwrap();

        assert_eq!(vec.with_label_values(&["success"]).unwrap().get(), 2.0);
        assert_eq!(vec.with_label_values(&["fail"]).unwrap().get(), 1.0);
        assert_eq!(children(&vec), 2);
    }

    #[test]
    fn test_vec_racing_first_use_shares_child() {
        let opts = Opts::new("g", "help");
        let vec = GaugeVec::new(prometheus::GaugeVec::new(opts, &["kind"]).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let vec = vec.clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        vec.add(1.0, &["shared"]).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(vec.with_label_values(&["shared"]).unwrap().get(), 8_000.0);
    }
}
