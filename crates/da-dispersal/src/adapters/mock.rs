//! In-memory collaborators for tests and local runs.

use crate::domain::{
    keccak256, Address, Attestation, BatchHeader, Blob, BlobCertificate, BlobCommitment,
    BlobHeader, BlobInclusionInfo, BlobKey, BlobStatus, CertVersion, Certificate,
    NonSignerStakesAndSignature, QuorumId, SignedBatch, StatusSnapshot,
};
use crate::ports::outbound::{
    CertVerifierContract, ChainError, ChainReader, CheckDaCertStatus, ClientError,
    DisperseReply, DisperserClient,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use primitive_types::H256;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Snapshot of a batched blob with the given per-quorum signed percentages.
pub fn signed_snapshot(
    status: BlobStatus,
    reference_block_number: u64,
    blob_quorums: &[QuorumId],
    signed: &[(QuorumId, u8)],
) -> StatusSnapshot {
    StatusSnapshot {
        status,
        signed_batch: Some(SignedBatch {
            header: BatchHeader {
                batch_root: H256::repeat_byte(0xB0),
                reference_block_number,
            },
            attestation: Attestation {
                quorum_numbers: signed.iter().map(|(q, _)| *q).collect(),
                quorum_signed_percentages: signed.iter().map(|(_, p)| *p).collect(),
                ..Default::default()
            },
        }),
        blob_inclusion_info: Some(BlobInclusionInfo {
            blob_certificate: BlobCertificate {
                blob_header: BlobHeader {
                    quorum_numbers: blob_quorums.to_vec(),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        }),
    }
}

// =============================================================================
// DISPERSER CLIENT
// =============================================================================

/// A recorded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub blob_key: BlobKey,
    pub quorums: Vec<QuorumId>,
    pub symbols: usize,
}

/// Disperser client that replays a script of poll results.
///
/// Once the script runs out, the last entry is repeated.
#[derive(Default)]
pub struct ScriptedDisperserClient {
    script: Mutex<VecDeque<Result<StatusSnapshot, ClientError>>>,
    last: Mutex<Option<Result<StatusSnapshot, ClientError>>>,
    submit_error: Mutex<Option<ClientError>>,
    reported_key: Mutex<Option<BlobKey>>,
    submit_latency: RwLock<Duration>,
    submissions: Mutex<Vec<Submission>>,
    nonce: AtomicU64,
    polls: AtomicUsize,
    closed: AtomicBool,
}

impl ScriptedDisperserClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = StatusSnapshot>) -> Self {
        let client = Self::new();
        for status in statuses {
            client.push_status(status);
        }
        client
    }

    pub fn push_status(&self, snapshot: StatusSnapshot) {
        self.script.lock().push_back(Ok(snapshot));
    }

    pub fn push_error(&self, err: ClientError) {
        self.script.lock().push_back(Err(err));
    }

    /// Make the next submissions fail.
    pub fn fail_submission(&self, err: Option<ClientError>) {
        *self.submit_error.lock() = err;
    }

    /// Report this key instead of the header's hash.
    pub fn report_key(&self, key: Option<BlobKey>) {
        *self.reported_key.lock() = key;
    }

    pub fn set_submit_latency(&self, latency: Duration) {
        *self.submit_latency.write() = latency;
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DisperserClient for ScriptedDisperserClient {
    async fn disperse_blob(
        &self,
        blob: &Blob,
        blob_version: u16,
        quorums: &[QuorumId],
    ) -> Result<DisperseReply, ClientError> {
        let latency = *self.submit_latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        if let Some(err) = self.submit_error.lock().clone() {
            return Err(err);
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let blob_header = BlobHeader {
            version: blob_version,
            quorum_numbers: quorums.to_vec(),
            commitment: BlobCommitment {
                commitment: keccak256(blob.as_bytes()).as_bytes().to_vec(),
                length: blob.len_symbols() as u32,
                ..Default::default()
            },
            payment_header_hash: keccak256(&nonce.to_be_bytes()),
        };
        let reported = *self.reported_key.lock();
        let blob_key = reported.unwrap_or_else(|| blob_header.blob_key());

        self.submissions.lock().push(Submission {
            blob_key,
            quorums: quorums.to_vec(),
            symbols: blob.len_symbols(),
        });

        Ok(DisperseReply {
            status: BlobStatus::Queued,
            blob_key,
            blob_header,
        })
    }

    async fn blob_status(&self, _blob_key: &BlobKey) -> Result<StatusSnapshot, ClientError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        let next = self.script.lock().pop_front();
        match next {
            Some(result) => {
                *self.last.lock() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| Ok(StatusSnapshot::pending(BlobStatus::Queued))),
        }
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// CHAIN
// =============================================================================

/// Chain head controlled by the test.
pub struct ManualChainReader {
    block: AtomicU64,
    reads: AtomicU64,
    failure: RwLock<Option<ChainError>>,
}

impl ManualChainReader {
    pub fn new(block: u64) -> Self {
        Self {
            block: AtomicU64::new(block),
            reads: AtomicU64::new(0),
            failure: RwLock::new(None),
        }
    }

    pub fn set(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    pub fn advance(&self, blocks: u64) -> u64 {
        self.block.fetch_add(blocks, Ordering::SeqCst) + blocks
    }

    /// Make reads fail until cleared with `None`.
    pub fn fail_with(&self, err: Option<ChainError>) {
        *self.failure.write() = err;
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainReader for ManualChainReader {
    async fn latest_block_number(&self) -> Result<u64, ChainError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.read().clone() {
            return Err(err);
        }
        Ok(self.block.load(Ordering::SeqCst))
    }
}

/// Verifier contract with settable answers.
///
/// Verifiers speak V3 certificates unless told otherwise. `check_da_cert`
/// reverts on bytes that do not decode as the verifier's version.
pub struct MockCertVerifierContract {
    required_quorums: RwLock<Vec<QuorumId>>,
    default_threshold: u8,
    thresholds: RwLock<HashMap<Address, u8>>,
    cert_versions: RwLock<HashMap<Address, u8>>,
    derivation_versions: RwLock<HashMap<Address, u16>>,
    check_status: RwLock<CheckDaCertStatus>,
    failure: RwLock<Option<ChainError>>,
    latency: RwLock<Duration>,
    checked: Mutex<Vec<Address>>,
    threshold_reads: AtomicUsize,
}

impl MockCertVerifierContract {
    pub fn new(required_quorums: Vec<QuorumId>, default_threshold: u8) -> Self {
        Self {
            required_quorums: RwLock::new(required_quorums),
            default_threshold,
            thresholds: RwLock::new(HashMap::new()),
            cert_versions: RwLock::new(HashMap::new()),
            derivation_versions: RwLock::new(HashMap::new()),
            check_status: RwLock::new(CheckDaCertStatus::Success),
            failure: RwLock::new(None),
            latency: RwLock::new(Duration::ZERO),
            checked: Mutex::new(Vec::new()),
            threshold_reads: AtomicUsize::new(0),
        }
    }

    pub fn set_required_quorums(&self, quorums: Vec<QuorumId>) {
        *self.required_quorums.write() = quorums;
    }

    pub fn set_threshold(&self, verifier: Address, threshold: u8) {
        self.thresholds.write().insert(verifier, threshold);
    }

    /// Raw `certVersion()` answer for one verifier.
    pub fn set_cert_version(&self, verifier: Address, code: u8) {
        self.cert_versions.write().insert(verifier, code);
    }

    pub fn set_offchain_derivation_version(&self, verifier: Address, version: u16) {
        self.derivation_versions.write().insert(verifier, version);
    }

    fn cert_version_of(&self, verifier: &Address) -> u8 {
        self.cert_versions
            .read()
            .get(verifier)
            .copied()
            .unwrap_or(CertVersion::V3_CODE)
    }

    pub fn set_check_status(&self, status: CheckDaCertStatus) {
        *self.check_status.write() = status;
    }

    /// Make every call fail until cleared with `None`.
    pub fn fail_calls(&self, err: Option<ChainError>) {
        *self.failure.write() = err;
    }

    /// Delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Addresses `check_da_cert` was called against, in order.
    pub fn checked_addresses(&self) -> Vec<Address> {
        self.checked.lock().clone()
    }

    pub fn threshold_reads(&self) -> usize {
        self.threshold_reads.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), ChainError> {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.failure.read().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CertVerifierContract for MockCertVerifierContract {
    async fn quorum_numbers_required(&self, _verifier: Address) -> Result<Vec<QuorumId>, ChainError> {
        self.enter().await?;
        Ok(self.required_quorums.read().clone())
    }

    async fn confirmation_threshold(&self, verifier: Address) -> Result<u8, ChainError> {
        self.enter().await?;
        self.threshold_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .thresholds
            .read()
            .get(&verifier)
            .copied()
            .unwrap_or(self.default_threshold))
    }

    async fn cert_version(&self, verifier: Address) -> Result<u8, ChainError> {
        self.enter().await?;
        Ok(self.cert_version_of(&verifier))
    }

    async fn offchain_derivation_version(&self, verifier: Address) -> Result<u16, ChainError> {
        self.enter().await?;
        self.derivation_versions
            .read()
            .get(&verifier)
            .copied()
            .ok_or_else(|| ChainError::Reverted("offchainDerivationVersion not implemented".into()))
    }

    async fn non_signer_stakes_and_signature(
        &self,
        signed_batch: &SignedBatch,
    ) -> Result<NonSignerStakesAndSignature, ChainError> {
        self.enter().await?;
        let attestation = &signed_batch.attestation;
        Ok(NonSignerStakesAndSignature {
            non_signer_quorum_bitmap_indices: vec![0; attestation.non_signer_pubkeys.len()],
            non_signer_pubkeys: attestation.non_signer_pubkeys.clone(),
            quorum_apks: attestation.quorum_apks.clone(),
            apk_g2: attestation.apk_g2.clone(),
            sigma: attestation.sigma.clone(),
            quorum_apk_indices: vec![0; attestation.quorum_numbers.len()],
            total_stake_indices: vec![0; attestation.quorum_numbers.len()],
            non_signer_stake_indices: vec![Vec::new(); attestation.quorum_numbers.len()],
        })
    }

    async fn check_da_cert(
        &self,
        verifier: Address,
        cert_bytes: &[u8],
    ) -> Result<CheckDaCertStatus, ChainError> {
        self.enter().await?;
        self.checked.lock().push(verifier);
        let cert = Certificate::from_bytes(cert_bytes)
            .map_err(|e| ChainError::Reverted(format!("cannot decode certificate: {e}")))?;
        let expected = self.cert_version_of(&verifier);
        if cert.version.code() != expected {
            return Err(ChainError::Reverted(format!(
                "verifier expects certificate version {expected}, got {}",
                cert.version.code()
            )));
        }
        Ok(*self.check_status.read())
    }
}
