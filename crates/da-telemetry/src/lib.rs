//! # DA Telemetry
//!
//! Observability bootstrap for processes embedding the dispersal engine.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with env filter, pretty or JSON output
//! - **Traces**: OpenTelemetry OTLP export, enabled when an endpoint is set
//! - **Metrics**: Prometheus registry with text exposition
//!
//! ## Usage
//!
//! ```rust,ignore
//! use da_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let guard = init_telemetry(config).await.expect("Failed to init telemetry");
//!
//!     let timer = StageTimer::new("da", Some(guard.metrics().registry()))?;
//!     // ...
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | unset | OTLP collector endpoint |
//! | `OTEL_SERVICE_NAME` | `da-dispersal` | Service name in traces |
//! | `DA_LOG_LEVEL` | `info` | Log level filter |
//! | `DA_JSON_LOGS` | `false` | JSON console logs |
//! | `DA_METRICS_NAMESPACE` | `da` | Metric name prefix |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::MetricsRegistry;
pub use tracing_setup::{env_filter, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging, optional trace export and the global metrics
/// registry.
///
/// Returns a guard that must be held for the lifetime of the application.
/// When dropped, it flushes pending spans.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = MetricsRegistry::global(&config.metrics_namespace)?;
    let tracing = tracing_setup::init_tracing(&config).await?;

    Ok(TelemetryGuard {
        _tracing: tracing,
        metrics,
    })
}

/// Guard that keeps telemetry active. Drop to flush and shutdown.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    metrics: MetricsRegistry,
}

impl TelemetryGuard {
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}
