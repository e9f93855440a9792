//! Agent metric catalog
//!
//! The fixed set of measurements the agent exposes. Names are stable across
//! restarts since collectors key history on them.
//!
//! Adding a metric: add a field, register it in [`AgentMetrics::register`].

use std::fmt;

use super::counters::{Counter, CounterVec, Gauge};
use super::registry::Registry;
use crate::error::Result;

/// Namespace prepended to every agent metric
pub const NAMESPACE: &str = "cilium";

/// Result of an endpoint regeneration, the `outcome` label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegenerationOutcome {
    Success,
    Fail,
}

impl RegenerationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegenerationOutcome::Success => "success",
            RegenerationOutcome::Fail => "fail",
        }
    }
}

impl fmt::Display for RegenerationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handles to the agent's metrics
#[derive(Clone)]
pub struct AgentMetrics {
    // Endpoint
    /// Number of managed endpoints
    pub endpoint_count: Gauge,
    /// Number of endpoints currently regenerating
    pub endpoint_regenerating: Gauge,
    /// Completed regenerations by outcome
    pub endpoint_regenerations: CounterVec,

    // Policy
    /// Number of policies loaded into the agent
    pub policy_count: Gauge,
    /// Current policy revision number
    pub policy_max_revision: Gauge,
    /// Failed policy imports
    pub policy_import_errors: Counter,
}

impl AgentMetrics {
    /// Register the catalog, failing on any name clash
    pub fn register(registry: &mut Registry) -> Result<Self> {
        Ok(Self {
            endpoint_count: registry
                .register_gauge("endpoint_count", "Number of endpoints managed by this agent")?,
            endpoint_regenerating: registry.register_gauge(
                "endpoint_regenerating",
                "Number of endpoints currently regenerating",
            )?,
            endpoint_regenerations: registry.register_counter_vec(
                "endpoint_regenerations",
                "Count of all endpoint regenerations that have completed, tagged by outcome",
                &["outcome"],
            )?,
            policy_count: registry
                .register_gauge("policy_count", "Number of policies currently loaded")?,
            policy_max_revision: registry.register_gauge(
                "policy_max_revision",
                "Highest policy revision number in the agent",
            )?,
            policy_import_errors: registry.register_counter(
                "policy_import_errors",
                "Number of times a policy import has failed",
            )?,
        })
    }

    /// Record a finished regeneration
    pub fn endpoint_regenerated(&self, outcome: RegenerationOutcome) {
        // a single static label value always matches the schema
        if let Ok(counter) = self
            .endpoint_regenerations
            .with_label_values(&[outcome.as_str()])
        {
            counter.inc();
        }
    }

    /// Mark an endpoint regeneration as started
    #[inline]
    pub fn regeneration_started(&self) {
        self.endpoint_regenerating.inc();
    }

    /// Mark an endpoint regeneration as finished and record its outcome
    pub fn regeneration_finished(&self, outcome: RegenerationOutcome) {
        self.endpoint_regenerating.dec();
        self.endpoint_regenerated(outcome);
    }

    #[inline]
    pub fn policy_import_failed(&self) {
        self.policy_import_errors.inc();
    }

    /// Record a new policy revision
    pub fn policy_revision(&self, revision: u64) {
        self.policy_max_revision.set(revision as f64);
    }
}
