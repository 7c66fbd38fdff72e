//! # Dispersal Flows
//!
//! End-to-end runs of the orchestrator against a scripted backend and a
//! routed verifier stack.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use da_dispersal::adapters::CertVerifier;
    use da_dispersal::domain::{BlobStatus, Certificate, Payload, StatusSnapshot};
    use da_dispersal::ports::outbound::ClientError;
    use da_dispersal::{
        Budget, DispersalConfig, DispersalError, ErrorKind, PayloadDispersalApi, PayloadDisperser,
        Stage,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const RBN: u64 = 1_000;

    // =============================================================================
    // SCENARIO: EARLY SUCCESS WHILE GATHERING
    // =============================================================================

    /// QUEUED → ENCODED → GATHERING (40%) → GATHERING (60%): the second
    /// gathering poll meets the 55% threshold and ends the loop before any
    /// COMPLETE status is seen.
    #[tokio::test(start_paused = true)]
    async fn test_gathering_meets_threshold_before_complete() {
        let chain = Chain::new(RBN + 5);
        let client = scripted(vec![
            StatusSnapshot::pending(BlobStatus::Queued),
            StatusSnapshot::pending(BlobStatus::Encoded),
            gathering(RBN, &[(0, 40), (1, 80)]),
            gathering(RBN, &[(0, 60), (1, 80)]),
            complete(RBN, &[(0, 100), (1, 100)]),
        ]);
        let timer = timer();
        let disperser = chain.disperser(fast_config(), client.clone(), timer.clone());

        let cert = disperser
            .disperse(Payload::new(vec![0x5A; 4096]))
            .await
            .unwrap();

        assert_eq!(client.polls(), 4);
        assert_eq!(cert.reference_block_number(), RBN);
        assert_eq!(chain.contract.checked_addresses(), vec![VERIFIER_V1]);
        assert_eq!(timer.entries("GATHERING_SIGNATURES"), 1);
        assert_eq!(timer.entries("verify_cert"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_backend_progression() {
        let chain = Chain::new(RBN + 5);
        let client = Arc::new(TimedDisperserClient::new(vec![
            (Duration::ZERO, StatusSnapshot::pending(BlobStatus::Queued)),
            (
                Duration::from_millis(1500),
                StatusSnapshot::pending(BlobStatus::Encoded),
            ),
            (Duration::from_millis(3500), gathering(RBN, &[(0, 30), (1, 30)])),
            (Duration::from_millis(5500), complete(RBN, &[(0, 90), (1, 90)])),
        ]));
        let disperser = chain.disperser(fast_config(), client.clone(), timer());

        disperser.disperse(Payload::new(b"hello".to_vec())).await.unwrap();

        assert_eq!(
            client.seen(),
            vec![
                BlobStatus::Queued,
                BlobStatus::Encoded,
                BlobStatus::Encoded,
                BlobStatus::GatheringSignatures,
                BlobStatus::GatheringSignatures,
                BlobStatus::Complete,
            ]
        );
    }

    // =============================================================================
    // SCENARIO: TERMINAL FAILURE WITHIN ONE TICK
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_failed_on_first_poll_returns_within_one_tick() {
        let chain = Chain::new(RBN);
        let client = scripted(vec![StatusSnapshot::pending(BlobStatus::Failed)]);
        let config = fast_config();
        let tick = config.blob_status_poll_interval;
        let disperser = chain.disperser(config, client, timer());
        let start = Instant::now();

        let err = disperser
            .disperse(Payload::new(vec![1; 64]))
            .await
            .unwrap_err();

        assert!(start.elapsed() <= tick);
        assert_eq!(err.kind(), ErrorKind::TerminalBackend);
        assert!(err.to_string().contains("FAILED"));
        assert!(err.blob_key().is_some());
    }

    // =============================================================================
    // SCENARIO: SHORTFALL AFTER COMPLETE
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_complete_with_lower_percentage_than_earlier_poll() {
        let chain = Chain::new(RBN);
        let client = scripted(vec![
            gathering(RBN, &[(0, 50), (1, 50)]),
            complete(RBN, &[(0, 45), (1, 90)]),
        ]);
        let disperser = chain.disperser(fast_config(), client, timer());

        let err = disperser
            .disperse(Payload::new(vec![1; 64]))
            .await
            .unwrap_err();

        match &err {
            DispersalError::ThresholdShortfall { shortfall, .. } => {
                let quorums: Vec<_> = shortfall
                    .quorums
                    .iter()
                    .map(|q| (q.quorum, q.signed))
                    .collect();
                assert_eq!(quorums, vec![(0, 45)]);
            }
            other => panic!("expected shortfall, got {other:?}"),
        }
        assert!(err.should_failover());
    }

    // =============================================================================
    // SCENARIO: DEADLINE COMPOSITION
    // =============================================================================

    /// The configured overall timeout, the completion budget and the
    /// caller budget all bound the same poll loop; the smallest wins.
    #[tokio::test(start_paused = true)]
    async fn test_smallest_deadline_wins() {
        for (overall, caller, expected) in [
            (Duration::ZERO, None, Duration::from_secs(10)),
            (Duration::from_secs(6), None, Duration::from_secs(6)),
            (
                Duration::from_secs(6),
                Some(Duration::from_secs(4)),
                Duration::from_secs(4),
            ),
            (Duration::ZERO, Some(Duration::from_secs(30)), Duration::from_secs(10)),
        ] {
            let chain = Chain::new(RBN);
            let config = DispersalConfig {
                dispersal_timeout: overall,
                ..fast_config()
            };
            let disperser = chain.disperser(
                config,
                scripted(vec![StatusSnapshot::pending(BlobStatus::Encoded)]),
                timer(),
            );
            let budget = caller.map(Budget::with_timeout).unwrap_or_default();
            let start = Instant::now();

            let err = disperser
                .disperse_with_budget(Payload::new(vec![1; 64]), &budget)
                .await
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
            let elapsed = start.elapsed();
            assert!(
                elapsed >= expected && elapsed < expected + Duration::from_secs(1),
                "expected ~{expected:?}, took {elapsed:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_poll_keeps_blob_key_for_caller() {
        let chain = Chain::new(RBN);
        let client = scripted(vec![StatusSnapshot::pending(BlobStatus::Queued)]);
        let disperser = chain.disperser(fast_config(), client.clone(), timer());
        let budget = Budget::unbounded();
        let token = budget.cancellation_token().clone();

        let (result, _) = tokio::join!(
            disperser.disperse_with_budget(Payload::new(vec![1; 64]), &budget),
            async {
                tokio::time::sleep(Duration::from_millis(3200)).await;
                token.cancel();
            }
        );

        assert_eq!(
            result.unwrap_err(),
            DispersalError::Cancelled {
                stage: Stage::PollStatus
            }
        );
        // The backend still knows the blob; the caller may re-poll.
        assert_eq!(client.submissions().len(), 1);
        assert_eq!(client.polls(), 3);
    }

    // =============================================================================
    // SCENARIO: LAGGING CHAIN HEAD
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_build_waits_for_lagging_chain_head() {
        let chain = Chain::new(RBN - 3);
        // Fixed authority: the threshold lookup does not depend on the head.
        let verifier = Arc::new(CertVerifier::fixed(chain.contract.clone(), VERIFIER_V1));
        let disperser = PayloadDisperser::new(
            fast_config(),
            scripted(vec![complete(RBN, &[(0, 90), (1, 90)])]),
            verifier,
            chain.head.clone(),
            timer(),
        )
        .unwrap();

        let head = chain.head.clone();
        let (result, _) = tokio::join!(disperser.disperse(Payload::new(vec![7; 128])), async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(900)).await;
                head.advance(1);
            }
        });

        let cert: Certificate = result.unwrap();
        assert_eq!(cert.reference_block_number(), RBN);
        assert!(disperser.block_monitor().latest_seen() >= RBN);
        assert!(chain.head.reads() >= 2);
    }

    // =============================================================================
    // SCENARIO: CONCURRENT DISPERSALS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_many_concurrent_dispersals_share_one_engine() {
        let chain = Chain::new(RBN);
        let client = scripted(vec![complete(RBN, &[(0, 70), (1, 70)])]);
        let timer = timer();
        let disperser = Arc::new(chain.disperser(fast_config(), client.clone(), timer.clone()));

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let disperser = Arc::clone(&disperser);
            handles.push(tokio::spawn(async move {
                disperser.disperse(Payload::new(vec![i; 100 + i as usize])).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut keys: Vec<_> = client.submissions().into_iter().map(|s| s.blob_key).collect();
        keys.sort_by_key(|k| k.0);
        keys.dedup();
        assert_eq!(keys.len(), 16);
        assert_eq!(timer.entries("verify_cert"), 16);
        assert_eq!(timer.in_flight("QUEUED"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_polls_do_not_reset_budget() {
        let chain = Chain::new(RBN);
        let client = scripted(vec![]);
        for _ in 0..20 {
            client.push_error(ClientError::Transport("unavailable".into()));
        }
        let disperser = chain.disperser(fast_config(), client.clone(), timer());
        let start = Instant::now();

        let err = disperser
            .disperse(Payload::new(vec![1; 64]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        assert!(start.elapsed() < Duration::from_secs(11));
        assert!(client.polls() >= 9);
    }

    #[tokio::test]
    async fn test_close_then_disperse() {
        let chain = Chain::new(RBN);
        let client = scripted(vec![]);
        let disperser = chain.disperser(fast_config(), client.clone(), timer());

        disperser.close().await.unwrap();
        assert!(client.is_closed());
        assert_eq!(
            disperser.close().await.unwrap_err().kind(),
            ErrorKind::Closed
        );
        assert_eq!(
            disperser
                .disperse(Payload::new(vec![1]))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::Closed
        );
    }
}
