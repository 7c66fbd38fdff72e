//! # Authority Routing
//!
//! Verifier selection by reference block number, and the activation guards
//! on the router.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use da_dispersal::domain::{CertVersion, Certificate, Payload, RouterError};
    use da_dispersal::ports::outbound::{AuthorityRouter, VerificationError};
    use da_dispersal::{DispersalError, ErrorKind, PayloadDispersalApi, Stage};

    #[tokio::test]
    async fn test_activation_must_be_in_future() {
        let chain = Chain::new(500);

        let err = chain
            .router
            .add_authority(500, VERIFIER_V2)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RouterError::ActivationNotInFuture {
                activation_block: 500,
                current_block: 500,
            }
        );

        chain.router.add_authority(600, VERIFIER_V2).await.unwrap();
        let err = chain
            .router
            .add_authority(550, VERIFIER_V1)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ActivationNotAfterLast { .. }));
        assert_eq!(chain.router.history().activations().len(), 2);
    }

    #[tokio::test]
    async fn test_resolution_follows_activation_history() {
        let chain = Chain::new(100);
        chain.router.add_authority(200, VERIFIER_V2).await.unwrap();
        chain.head.set(300);

        assert_eq!(chain.router.resolve_authority(0).await.unwrap(), VERIFIER_V1);
        assert_eq!(chain.router.resolve_authority(199).await.unwrap(), VERIFIER_V1);
        assert_eq!(chain.router.resolve_authority(200).await.unwrap(), VERIFIER_V2);
        assert_eq!(chain.router.resolve_authority(300).await.unwrap(), VERIFIER_V2);
        assert!(matches!(
            chain.router.resolve_authority(301).await,
            Err(RouterError::ReferenceBlockInFuture { .. })
        ));
    }

    /// Two dispersals straddling an activation are checked against
    /// different verifiers, each with its own threshold.
    #[tokio::test(start_paused = true)]
    async fn test_dispersals_use_authority_active_at_rbn() {
        let chain = Chain::new(100);
        chain.router.add_authority(200, VERIFIER_V2).await.unwrap();
        chain.head.set(250);
        chain.contract.set_threshold(VERIFIER_V2, 90);

        let before = chain.disperser(
            fast_config(),
            scripted(vec![complete(150, &[(0, 60), (1, 60)])]),
            timer(),
        );
        before.disperse(Payload::new(vec![1; 32])).await.unwrap();

        let after = chain.disperser(
            fast_config(),
            scripted(vec![complete(220, &[(0, 60), (1, 60)])]),
            timer(),
        );
        let err = after.disperse(Payload::new(vec![2; 32])).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ThresholdShortfall);
        assert_eq!(chain.contract.checked_addresses(), vec![VERIFIER_V1]);
    }

    /// A verifier upgrade changes the certificate layout for reference
    /// blocks at or after its activation.
    #[tokio::test(start_paused = true)]
    async fn test_certificate_version_follows_authority_at_rbn() {
        let chain = Chain::new(100);
        chain.router.add_authority(200, VERIFIER_V2).await.unwrap();
        chain.head.set(250);
        chain
            .contract
            .set_cert_version(VERIFIER_V2, CertVersion::V4_CODE);
        chain.contract.set_offchain_derivation_version(VERIFIER_V2, 2);

        let before = chain
            .disperser(
                fast_config(),
                scripted(vec![complete(150, &[(0, 90), (1, 90)])]),
                timer(),
            )
            .disperse(Payload::new(vec![4; 32]))
            .await
            .unwrap();
        let after = chain
            .disperser(
                fast_config(),
                scripted(vec![complete(220, &[(0, 90), (1, 90)])]),
                timer(),
            )
            .disperse(Payload::new(vec![5; 32]))
            .await
            .unwrap();

        assert_eq!(before.version, CertVersion::V3);
        assert_eq!(
            after.version,
            CertVersion::V4 {
                offchain_derivation_version: 2
            }
        );
        assert_eq!(Certificate::from_bytes(&after.to_bytes()).unwrap(), after);
        assert_eq!(
            chain.contract.checked_addresses(),
            vec![VERIFIER_V1, VERIFIER_V2]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_certificate_from_future_block_is_rejected() {
        let chain = Chain::new(100);
        let disperser = chain.disperser(
            fast_config(),
            scripted(vec![complete(100, &[(0, 90), (1, 90)])]),
            timer(),
        );
        let mut cert = disperser.disperse(Payload::new(vec![3; 32])).await.unwrap();
        cert.batch_header.reference_block_number = 5_000;

        let err = disperser.verify_certificate(&cert).await.unwrap_err();

        assert!(matches!(
            err,
            DispersalError::Authority {
                stage: Stage::VerifyCert,
                source: VerificationError::Router(RouterError::ReferenceBlockInFuture { .. }),
            }
        ));
        assert_eq!(err.kind(), ErrorKind::ChainUnavailable);
        assert!(!err.should_failover());
    }
}
