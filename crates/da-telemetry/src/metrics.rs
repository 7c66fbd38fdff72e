//! Prometheus metrics for DA dispersal.
//!
//! All metrics follow the naming convention: `<namespace>_<metric>_<unit>`
//!
//! The engine's stage timer registers its families in a [`MetricsRegistry`];
//! dispersal outcomes are counted here.

use lazy_static::lazy_static;
use prometheus::{core::Collector, Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide registry used by [`MetricsRegistry::global`].
    static ref REGISTRY: Registry = Registry::new();
}

/// Handle on a prometheus registry with text exposition.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    outcomes: IntCounterVec,
}

impl MetricsRegistry {
    /// Fresh registry, isolated from the global one.
    pub fn new(namespace: &str) -> Result<Self, TelemetryError> {
        Self::with_registry(Registry::new(), namespace)
    }

    /// Handle on the process-wide registry.
    ///
    /// Fails if the outcome counter was already registered under the same
    /// namespace.
    pub fn global(namespace: &str) -> Result<Self, TelemetryError> {
        Self::with_registry(REGISTRY.clone(), namespace)
    }

    fn with_registry(registry: Registry, namespace: &str) -> Result<Self, TelemetryError> {
        let outcomes = IntCounterVec::new(
            Opts::new("dispersals_total", "Dispersals by outcome and error kind")
                .namespace(namespace),
            &["outcome", "kind"], // outcome: success/failure, kind: error kind or "none"
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        registry
            .register(Box::new(outcomes.clone()))
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        Ok(Self { registry, outcomes })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Register an additional collector.
    pub fn register(&self, collector: Box<dyn Collector>) -> Result<(), TelemetryError> {
        self.registry
            .register(collector)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }

    /// Count one successful dispersal.
    pub fn record_success(&self) {
        self.outcomes.with_label_values(&["success", "none"]).inc();
    }

    /// Count one failed dispersal of the given error kind.
    pub fn record_failure(&self, kind: &str) {
        self.outcomes.with_label_values(&["failure", kind]).inc();
    }

    pub fn outcome_count(&self, outcome: &str, kind: &str) -> u64 {
        self.outcomes.with_label_values(&[outcome, kind]).get()
    }

    /// Encode all metrics as Prometheus text format.
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}
