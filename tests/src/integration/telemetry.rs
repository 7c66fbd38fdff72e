//! # Telemetry
//!
//! Stage metrics from real dispersals, exported through the telemetry
//! registry.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use da_dispersal::domain::{BlobStatus, Payload, StatusSnapshot};
    use da_dispersal::{PayloadDispersalApi, StageTimer};
    use da_telemetry::{MetricsRegistry, TelemetryConfig};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_stage_metrics_exported() {
        let metrics = MetricsRegistry::new("da").unwrap();
        let timer = Arc::new(StageTimer::new("da", Some(metrics.registry())).unwrap());
        let chain = Chain::new(10);
        let disperser = chain.disperser(
            fast_config(),
            scripted(vec![
                StatusSnapshot::pending(BlobStatus::Encoded),
                complete(10, &[(0, 99), (1, 99)]),
            ]),
            timer.clone(),
        );

        match disperser.disperse(Payload::new(vec![1; 256])).await {
            Ok(_) => metrics.record_success(),
            Err(e) => metrics.record_failure(&format!("{:?}", e.kind())),
        }

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("da_stage_latency_seconds"));
        assert!(text.contains(r#"da_stage_entries_total{stage="ENCODED"} 1"#));
        assert!(text.contains(r#"da_stage_in_flight{stage="verify_cert"} 0"#));
        assert!(text.contains(r#"da_dispersals_total{kind="none",outcome="success"} 1"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_counted_by_kind() {
        let metrics = MetricsRegistry::new("da").unwrap();
        let chain = Chain::new(10);
        let disperser = chain.disperser(
            fast_config(),
            scripted(vec![StatusSnapshot::pending(BlobStatus::Failed)]),
            timer(),
        );

        let err = disperser
            .disperse(Payload::new(vec![1; 16]))
            .await
            .unwrap_err();
        metrics.record_failure(&format!("{:?}", err.kind()));

        assert_eq!(metrics.outcome_count("failure", "TerminalBackend"), 1);
    }

    #[test]
    fn test_default_telemetry_config_does_not_export() {
        let config = TelemetryConfig::default();
        assert!(!config.exports_traces());
        assert_eq!(config.metrics_namespace, "da");
    }
}
