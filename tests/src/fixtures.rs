//! Shared fixtures for the scenario tests.

use async_trait::async_trait;
use da_dispersal::adapters::{
    signed_snapshot, CertVerifier, InMemoryAuthorityRouter, ManualChainReader,
    MockCertVerifierContract, ScriptedDisperserClient,
};
use da_dispersal::domain::{
    Address, AuthorityHistory, Blob, BlobKey, BlobStatus, QuorumId, StatusSnapshot,
};
use da_dispersal::ports::outbound::{ClientError, DisperseReply, DisperserClient};
use da_dispersal::{DispersalConfig, PayloadDisperser, StageTimer};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const VERIFIER_V1: Address = Address::repeat_byte(0xA1);
pub const VERIFIER_V2: Address = Address::repeat_byte(0xA2);
pub const REQUIRED_QUORUMS: [QuorumId; 2] = [0, 1];
pub const THRESHOLD: u8 = 55;

pub type RoutedVerifier = CertVerifier<MockCertVerifierContract>;

/// One-second ticks, ten-second completion budget.
pub fn fast_config() -> DispersalConfig {
    DispersalConfig {
        contract_call_timeout: Duration::from_secs(5),
        disperse_blob_timeout: Duration::from_secs(5),
        blob_complete_timeout: Duration::from_secs(10),
        blob_status_poll_interval: Duration::from_secs(1),
        block_number_poll_interval: Duration::from_secs(1),
        ..Default::default()
    }
}

pub fn gathering(rbn: u64, signed: &[(QuorumId, u8)]) -> StatusSnapshot {
    signed_snapshot(BlobStatus::GatheringSignatures, rbn, &REQUIRED_QUORUMS, signed)
}

pub fn complete(rbn: u64, signed: &[(QuorumId, u8)]) -> StatusSnapshot {
    signed_snapshot(BlobStatus::Complete, rbn, &REQUIRED_QUORUMS, signed)
}

/// Verifier stack behind a router, with a chain head the test controls.
pub struct Chain {
    pub head: Arc<ManualChainReader>,
    pub router: Arc<InMemoryAuthorityRouter>,
    pub contract: Arc<MockCertVerifierContract>,
    pub verifier: Arc<RoutedVerifier>,
}

impl Chain {
    /// `VERIFIER_V1` active from genesis, chain head at `head`.
    pub fn new(head: u64) -> Self {
        let head = Arc::new(ManualChainReader::new(head));
        let router = Arc::new(InMemoryAuthorityRouter::new(
            AuthorityHistory::with_initial(0, VERIFIER_V1),
            head.clone(),
        ));
        let contract = Arc::new(MockCertVerifierContract::new(
            REQUIRED_QUORUMS.to_vec(),
            THRESHOLD,
        ));
        let verifier = Arc::new(CertVerifier::routed(
            Arc::clone(&contract),
            router.clone(),
            head.clone(),
        ));
        Self {
            head,
            router,
            contract,
            verifier,
        }
    }

    /// Disperser over the routed verifier, waiting on this chain's head.
    pub fn disperser<C: DisperserClient>(
        &self,
        config: DispersalConfig,
        client: Arc<C>,
        timer: Arc<StageTimer>,
    ) -> PayloadDisperser<C, RoutedVerifier> {
        PayloadDisperser::new(
            config,
            client,
            Arc::clone(&self.verifier),
            self.head.clone(),
            timer,
        )
        .expect("valid test config")
    }
}

pub fn scripted(statuses: Vec<StatusSnapshot>) -> Arc<ScriptedDisperserClient> {
    Arc::new(ScriptedDisperserClient::with_statuses(statuses))
}

pub fn timer() -> Arc<StageTimer> {
    Arc::new(StageTimer::new("da_test", None).expect("metrics"))
}

/// Disperser whose reported status depends on time since submission.
///
/// The schedule lists `(offset, snapshot)` pairs in ascending offset; a
/// poll sees the last entry whose offset has passed.
pub struct TimedDisperserClient {
    inner: ScriptedDisperserClient,
    schedule: Vec<(Duration, StatusSnapshot)>,
    submitted_at: Mutex<Option<Instant>>,
    seen: Mutex<Vec<BlobStatus>>,
}

impl TimedDisperserClient {
    pub fn new(schedule: Vec<(Duration, StatusSnapshot)>) -> Self {
        Self {
            inner: ScriptedDisperserClient::new(),
            schedule,
            submitted_at: Mutex::new(None),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Statuses returned so far, in poll order.
    pub fn seen(&self) -> Vec<BlobStatus> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl DisperserClient for TimedDisperserClient {
    async fn disperse_blob(
        &self,
        blob: &Blob,
        blob_version: u16,
        quorums: &[QuorumId],
    ) -> Result<DisperseReply, ClientError> {
        let reply = self.inner.disperse_blob(blob, blob_version, quorums).await?;
        *self.submitted_at.lock() = Some(Instant::now());
        Ok(reply)
    }

    async fn blob_status(&self, _blob_key: &BlobKey) -> Result<StatusSnapshot, ClientError> {
        let Some(submitted_at) = *self.submitted_at.lock() else {
            return Err(ClientError::Rejected("unknown blob key".into()));
        };
        let elapsed = submitted_at.elapsed();
        let snapshot = self
            .schedule
            .iter()
            .take_while(|(offset, _)| *offset <= elapsed)
            .last()
            .map(|(_, snapshot)| snapshot.clone())
            .unwrap_or_else(|| StatusSnapshot::pending(BlobStatus::Queued));
        self.seen.lock().push(snapshot.status);
        Ok(snapshot)
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.inner.close().await
    }
}
