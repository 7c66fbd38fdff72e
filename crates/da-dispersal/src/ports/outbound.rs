//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Collaborators the dispersal engine consumes. All of them are shared
//! between concurrent dispersals and must be `Send + Sync`.

use crate::domain::{
    Address, Blob, BlobHeader, BlobKey, BlobStatus, CertVersion, Certificate,
    NonSignerStakesAndSignature, QuorumId, RouterError, SignedBatch, StatusSnapshot,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

// =============================================================================
// DISPERSAL BACKEND
// =============================================================================

/// Errors from the dispersal backend RPC client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Network or transport failure; the call may succeed if repeated.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("client is closed")]
    Closed,
}

/// Reply to a blob submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisperseReply {
    pub status: BlobStatus,
    /// Key reported by the backend.
    pub blob_key: BlobKey,
    /// Header the backend accepted; the key must match its hash.
    pub blob_header: BlobHeader,
}

/// Submission and status RPC.
#[async_trait]
pub trait DisperserClient: Send + Sync {
    /// Submit a blob for the given quorums.
    async fn disperse_blob(
        &self,
        blob: &Blob,
        blob_version: u16,
        quorums: &[QuorumId],
    ) -> Result<DisperseReply, ClientError>;

    /// Current status of a previously submitted blob.
    async fn blob_status(&self, blob_key: &BlobKey) -> Result<StatusSnapshot, ClientError>;

    /// Release held connections.
    async fn close(&self) -> Result<(), ClientError>;
}

// =============================================================================
// CHAIN
// =============================================================================

/// Errors reading chain state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("chain unavailable: {0}")]
    Unavailable(String),

    #[error("contract call reverted: {0}")]
    Reverted(String),
}

/// Latest block number of the settlement chain.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64, ChainError>;
}

/// Result code of the on-chain `checkDACert` view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckDaCertStatus {
    /// Zero value; only returned when the call itself is broken.
    NullError,
    Success,
    InvalidInclusionProof,
    SecurityAssumptionsNotMet,
    BlobQuorumsNotSubset,
    RequiredQuorumsNotSubset,
    Other(u8),
}

impl CheckDaCertStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::NullError,
            1 => Self::Success,
            2 => Self::InvalidInclusionProof,
            3 => Self::SecurityAssumptionsNotMet,
            4 => Self::BlobQuorumsNotSubset,
            5 => Self::RequiredQuorumsNotSubset,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::NullError => 0,
            Self::Success => 1,
            Self::InvalidInclusionProof => 2,
            Self::SecurityAssumptionsNotMet => 3,
            Self::BlobQuorumsNotSubset => 4,
            Self::RequiredQuorumsNotSubset => 5,
            Self::Other(code) => *code,
        }
    }
}

impl fmt::Display for CheckDaCertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullError => f.write_str("NULL_ERROR"),
            Self::Success => f.write_str("SUCCESS"),
            Self::InvalidInclusionProof => f.write_str("INVALID_INCLUSION_PROOF"),
            Self::SecurityAssumptionsNotMet => f.write_str("SECURITY_ASSUMPTIONS_NOT_MET"),
            Self::BlobQuorumsNotSubset => f.write_str("BLOB_QUORUMS_NOT_SUBSET"),
            Self::RequiredQuorumsNotSubset => f.write_str("REQUIRED_QUORUMS_NOT_SUBSET"),
            Self::Other(code) => write!(f, "UNKNOWN_STATUS_{code}"),
        }
    }
}

/// Certificate verifier contract calls, scoped by contract address.
#[async_trait]
pub trait CertVerifierContract: Send + Sync {
    async fn quorum_numbers_required(&self, verifier: Address) -> Result<Vec<QuorumId>, ChainError>;

    async fn confirmation_threshold(&self, verifier: Address) -> Result<u8, ChainError>;

    /// Raw `certVersion()` of the verifier.
    async fn cert_version(&self, verifier: Address) -> Result<u8, ChainError>;

    /// `offchainDerivationVersion()`; only exposed by V4 verifiers.
    async fn offchain_derivation_version(&self, verifier: Address) -> Result<u16, ChainError>;

    /// Non-signer aggregate for a signed batch, read at its reference block.
    async fn non_signer_stakes_and_signature(
        &self,
        signed_batch: &SignedBatch,
    ) -> Result<NonSignerStakesAndSignature, ChainError>;

    /// Run `checkDACert` against the encoded certificate.
    async fn check_da_cert(
        &self,
        verifier: Address,
        cert_bytes: &[u8],
    ) -> Result<CheckDaCertStatus, ChainError>;
}

/// Versioned verifier address lookup.
#[async_trait]
pub trait AuthorityRouter: Send + Sync {
    /// Address active at `reference_block`.
    async fn resolve_authority(&self, reference_block: u64) -> Result<Address, RouterError>;

    /// Schedule a new authority. Rejects activation at or before the
    /// current block.
    async fn add_authority(&self, activation_block: u64, address: Address)
        -> Result<(), RouterError>;
}

// =============================================================================
// VERIFYING AUTHORITY
// =============================================================================

/// Errors from the verifying authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The certificate itself is invalid. Never retry with the same one.
    #[error("invalid certificate: checkDACert returned {status}")]
    InvalidCertificate { status: CheckDaCertStatus },

    /// The verifier misbehaved (encoding failure, null status).
    #[error("cert verifier internal error: {0}")]
    Internal(String),

    /// The verifier speaks a certificate layout this client cannot build.
    #[error("unsupported certificate version {version}")]
    UnsupportedCertVersion { version: u8 },

    /// The check could not be performed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Router(#[from] RouterError),
}

impl VerificationError {
    pub fn is_invalid_certificate(&self) -> bool {
        matches!(self, Self::InvalidCertificate { .. })
    }
}

/// Chain-backed authority consumed by the orchestrator.
#[async_trait]
pub trait VerifyingAuthority: Send + Sync {
    /// Quorums every blob must currently be dispersed to.
    async fn required_quorums(&self) -> Result<Vec<QuorumId>, VerificationError>;

    /// Confirmation threshold (percent) applicable at `reference_block`.
    async fn confirmation_threshold(&self, reference_block: u64) -> Result<u8, VerificationError>;

    /// Certificate layout expected by the verifier active at
    /// `reference_block`.
    async fn cert_version(&self, reference_block: u64) -> Result<CertVersion, VerificationError>;

    async fn non_signer_stakes_and_signature(
        &self,
        signed_batch: &SignedBatch,
    ) -> Result<NonSignerStakesAndSignature, VerificationError>;

    async fn verify_certificate(&self, certificate: &Certificate) -> Result<(), VerificationError>;
}
