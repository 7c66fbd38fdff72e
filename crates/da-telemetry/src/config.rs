//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for logging, trace export and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// OTLP collector endpoint. Traces are only exported when set.
    pub otlp_endpoint: Option<String>,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether console logs are JSON formatted
    pub json_logs: bool,

    /// Deployment environment (devnet, testnet, mainnet)
    pub environment: String,

    /// Prefix for exported metric names
    pub metrics_namespace: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "da-dispersal".to_string(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            environment: "devnet".to_string(),
            metrics_namespace: "da".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: da-dispersal)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: unset, no export)
    /// - `DA_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `DA_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `DA_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `DA_ENVIRONMENT`: Deployment environment (default: devnet)
    /// - `DA_METRICS_NAMESPACE`: Metric name prefix (default: da)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "da-dispersal".to_string()),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            log_level: env::var("DA_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("DA_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("DA_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),

            environment: env::var("DA_ENVIRONMENT").unwrap_or_else(|_| "devnet".to_string()),

            metrics_namespace: env::var("DA_METRICS_NAMESPACE")
                .unwrap_or_else(|_| "da".to_string()),
        }
    }

    /// Whether spans are exported over OTLP.
    pub fn exports_traces(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
