//! Certificate Verifier Adapter
//!
//! Implements `VerifyingAuthority` over address-scoped verifier contract
//! calls. The verifier address comes from an [`AuthoritySource`], chosen
//! once at construction:
//!
//! - `Fixed`: one address for every reference block.
//! - `Routed`: the address active at the reference block, looked up
//!   through a router. Quorum lookups use the chain head.
//!
//! Nothing is cached between calls; required quorums, thresholds and
//! certificate versions are re-read every time.

use crate::domain::{
    Address, CertVersion, Certificate, NonSignerStakesAndSignature, QuorumId, SignedBatch,
};
use crate::ports::outbound::{
    AuthorityRouter, CertVerifierContract, ChainReader, CheckDaCertStatus, VerificationError,
    VerifyingAuthority,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

/// Where the verifier address comes from.
#[derive(Clone)]
pub enum AuthoritySource {
    Fixed(Address),
    Routed {
        router: Arc<dyn AuthorityRouter>,
        chain: Arc<dyn ChainReader>,
    },
}

impl AuthoritySource {
    /// Address active at `reference_block`.
    pub async fn address_at(&self, reference_block: u64) -> Result<Address, VerificationError> {
        match self {
            Self::Fixed(address) => Ok(*address),
            Self::Routed { router, .. } => Ok(router.resolve_authority(reference_block).await?),
        }
    }

    /// Address active at the chain head.
    pub async fn latest_address(&self) -> Result<Address, VerificationError> {
        match self {
            Self::Fixed(address) => Ok(*address),
            Self::Routed { router, chain } => {
                let head = chain.latest_block_number().await?;
                Ok(router.resolve_authority(head).await?)
            }
        }
    }
}

/// Chain-backed verifying authority.
pub struct CertVerifier<C: CertVerifierContract> {
    contract: Arc<C>,
    source: AuthoritySource,
}

impl<C: CertVerifierContract> CertVerifier<C> {
    pub fn new(contract: Arc<C>, source: AuthoritySource) -> Self {
        Self { contract, source }
    }

    pub fn fixed(contract: Arc<C>, address: Address) -> Self {
        Self::new(contract, AuthoritySource::Fixed(address))
    }

    pub fn routed(
        contract: Arc<C>,
        router: Arc<dyn AuthorityRouter>,
        chain: Arc<dyn ChainReader>,
    ) -> Self {
        Self::new(contract, AuthoritySource::Routed { router, chain })
    }

    pub fn source(&self) -> &AuthoritySource {
        &self.source
    }
}

#[async_trait]
impl<C: CertVerifierContract + 'static> VerifyingAuthority for CertVerifier<C> {
    async fn required_quorums(&self) -> Result<Vec<QuorumId>, VerificationError> {
        let address = self.source.latest_address().await?;
        Ok(self.contract.quorum_numbers_required(address).await?)
    }

    async fn confirmation_threshold(&self, reference_block: u64) -> Result<u8, VerificationError> {
        let address = self.source.address_at(reference_block).await?;
        Ok(self.contract.confirmation_threshold(address).await?)
    }

    async fn cert_version(&self, reference_block: u64) -> Result<CertVersion, VerificationError> {
        let address = self.source.address_at(reference_block).await?;
        match self.contract.cert_version(address).await? {
            CertVersion::V2_CODE => Ok(CertVersion::V2),
            CertVersion::V3_CODE => Ok(CertVersion::V3),
            CertVersion::V4_CODE => {
                let offchain_derivation_version =
                    self.contract.offchain_derivation_version(address).await?;
                Ok(CertVersion::V4 {
                    offchain_derivation_version,
                })
            }
            version => Err(VerificationError::UnsupportedCertVersion { version }),
        }
    }

    async fn non_signer_stakes_and_signature(
        &self,
        signed_batch: &SignedBatch,
    ) -> Result<NonSignerStakesAndSignature, VerificationError> {
        Ok(self
            .contract
            .non_signer_stakes_and_signature(signed_batch)
            .await?)
    }

    async fn verify_certificate(&self, certificate: &Certificate) -> Result<(), VerificationError> {
        let rbn = certificate.reference_block_number();
        let address = self.source.address_at(rbn).await?;
        let cert_bytes = certificate.to_bytes();

        let status = self
            .contract
            .check_da_cert(address, &cert_bytes)
            .await
            .map_err(|e| {
                error!(
                    verifier = ?address,
                    reference_block = rbn,
                    cert = %hex::encode(&cert_bytes),
                    error = %e,
                    "checkDACert call failed"
                );
                VerificationError::from(e)
            })?;

        match status {
            CheckDaCertStatus::Success => {
                debug!(verifier = ?address, reference_block = rbn, "certificate verified");
                Ok(())
            }
            CheckDaCertStatus::NullError => Err(VerificationError::Internal(format!(
                "checkDACert returned {status}"
            ))),
            status => Err(VerificationError::InvalidCertificate { status }),
        }
    }
}
