//! # Stage Timer
//!
//! Per-stage timing for in-flight dispersals.
//!
//! ## Metrics Exported
//!
//! - `<namespace>_stage_latency_seconds{stage}` - Histogram of time spent per stage
//! - `<namespace>_stage_in_flight{stage}` - Gauge of sequences currently in a stage
//! - `<namespace>_stage_entries_total{stage}` - Counter of stage entries
//!
//! A [`SequenceProbe`] follows one dispersal through its stages. Metric
//! updates are atomic, so any number of probes may share a timer.

use prometheus::{
    exponential_buckets, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Shared metric families for stage timing.
#[derive(Clone)]
pub struct StageTimer {
    latency: HistogramVec,
    in_flight: IntGaugeVec,
    entries: IntCounterVec,
}

impl StageTimer {
    /// Create the metric families, registering them in `registry` when given.
    pub fn new(namespace: &str, registry: Option<&Registry>) -> Result<Self, prometheus::Error> {
        let latency = HistogramVec::new(
            HistogramOpts::new("stage_latency_seconds", "Time spent in each dispersal stage")
                .namespace(namespace)
                .buckets(exponential_buckets(0.001, 2.0, 18)?),
            &["stage"],
        )?;
        let in_flight = IntGaugeVec::new(
            Opts::new("stage_in_flight", "Dispersals currently in each stage").namespace(namespace),
            &["stage"],
        )?;
        let entries = IntCounterVec::new(
            Opts::new("stage_entries_total", "Number of times each stage was entered")
                .namespace(namespace),
            &["stage"],
        )?;

        if let Some(registry) = registry {
            registry.register(Box::new(latency.clone()))?;
            registry.register(Box::new(in_flight.clone()))?;
            registry.register(Box::new(entries.clone()))?;
        }

        Ok(Self {
            latency,
            in_flight,
            entries,
        })
    }

    /// Start following a new sequence.
    pub fn probe(self: &Arc<Self>) -> SequenceProbe {
        SequenceProbe {
            timer: Arc::clone(self),
            current: None,
        }
    }

    /// Sequences currently in `stage`.
    pub fn in_flight(&self, stage: &str) -> i64 {
        self.in_flight.with_label_values(&[stage]).get()
    }

    /// Times `stage` was entered.
    pub fn entries(&self, stage: &str) -> u64 {
        self.entries.with_label_values(&[stage]).get()
    }

    /// Times `stage` was left.
    pub fn completed(&self, stage: &str) -> u64 {
        self.latency.with_label_values(&[stage]).get_sample_count()
    }

    /// Total time spent in `stage` across all sequences.
    pub fn total_latency(&self, stage: &str) -> Duration {
        let secs = self.latency.with_label_values(&[stage]).get_sample_sum();
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn enter(&self, stage: &str) {
        self.entries.with_label_values(&[stage]).inc();
        self.in_flight.with_label_values(&[stage]).inc();
    }

    fn leave(&self, stage: &str, elapsed: Duration) {
        self.in_flight.with_label_values(&[stage]).dec();
        self.latency
            .with_label_values(&[stage])
            .observe(elapsed.as_secs_f64());
    }
}

/// Tracks the current stage of one sequence.
///
/// Dropping the probe closes the current stage.
pub struct SequenceProbe {
    timer: Arc<StageTimer>,
    current: Option<(String, Instant)>,
}

impl SequenceProbe {
    /// Move to `stage`. Repeating the current stage is a no-op.
    pub fn set_stage(&mut self, stage: &str) {
        if matches!(&self.current, Some((name, _)) if name == stage) {
            return;
        }
        self.close_current();
        self.timer.enter(stage);
        self.current = Some((stage.to_string(), Instant::now()));
    }

    pub fn current_stage(&self) -> Option<&str> {
        self.current.as_ref().map(|(name, _)| name.as_str())
    }

    /// Close the current stage without starting another.
    pub fn end(&mut self) {
        self.close_current();
    }

    fn close_current(&mut self) {
        if let Some((name, started)) = self.current.take() {
            self.timer.leave(&name, started.elapsed());
        }
    }
}

impl Drop for SequenceProbe {
    fn drop(&mut self) {
        self.close_current();
    }
}
