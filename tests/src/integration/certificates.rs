//! # Certificates and Blob Encoding
//!
//! Portability of dispersal outputs: certificates survive their byte
//! encoding, and blobs decode back to the original payload.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use da_dispersal::config::DEFAULT_MAX_BLOB_SYMBOLS;
    use da_dispersal::domain::{
        Certificate, CertificateCodecError, Payload, PayloadError, PolynomialForm,
    };
    use da_dispersal::PayloadDispersalApi;
    use rand::{Rng, SeedableRng};

    const RBN: u64 = 42;

    async fn dispersed_certificate() -> Certificate {
        let chain = Chain::new(RBN);
        let disperser = chain.disperser(
            fast_config(),
            scripted(vec![complete(RBN, &[(0, 77), (1, 88)])]),
            timer(),
        );
        disperser
            .disperse(Payload::new(b"portable certificate".to_vec()))
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispersed_certificate_round_trips() {
        let cert = dispersed_certificate().await;

        let bytes = cert.to_bytes();
        let decoded = Certificate::from_bytes(&bytes).unwrap();

        assert_eq!(decoded, cert);
        assert_eq!(decoded.to_bytes(), bytes);
        assert_eq!(decoded.reference_block_number(), RBN);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decoded_certificate_verifies() {
        let chain = Chain::new(RBN);
        let disperser = chain.disperser(
            fast_config(),
            scripted(vec![complete(RBN, &[(0, 77), (1, 88)])]),
            timer(),
        );
        let cert = disperser.disperse(Payload::new(vec![9; 500])).await.unwrap();

        let shipped = hex::encode(cert.to_bytes());
        let received = Certificate::from_bytes(&hex::decode(shipped).unwrap()).unwrap();

        disperser.verify_certificate(&received).await.unwrap();
        assert_eq!(chain.contract.checked_addresses().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_and_truncated_bytes_rejected() {
        let cert = dispersed_certificate().await;
        let bytes = cert.to_bytes();

        let mut padded = bytes.clone();
        padded.extend_from_slice(&[0, 0]);
        assert_eq!(
            Certificate::from_bytes(&padded),
            Err(CertificateCodecError::TrailingBytes { trailing: 2 })
        );

        assert!(Certificate::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert_eq!(
            Certificate::from_bytes(&[]),
            Err(CertificateCodecError::Empty)
        );
    }

    #[test]
    fn test_random_payloads_survive_blob_encoding() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let len = rng.gen_range(1..20_000);
            let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let payload = Payload::new(bytes);

            let blob = payload
                .to_blob(PolynomialForm::Coeff, DEFAULT_MAX_BLOB_SYMBOLS)
                .unwrap();

            assert!(blob.len_symbols().is_power_of_two());
            assert_eq!(blob.to_payload().unwrap(), payload);
        }
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = Payload::new(vec![1; 4096]);
        assert!(matches!(
            payload.to_blob(PolynomialForm::Coeff, 64),
            Err(PayloadError::BlobTooLarge { max: 64, .. })
        ));
    }
}
