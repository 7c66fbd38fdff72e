//! # Payload Disperser
//!
//! The dispersal orchestrator. One call drives one payload end to end:
//!
//! ```text
//! convert_to_blob → get_quorums → disperse_blob → verify_blob_key
//!     → QUEUED / ENCODED / GATHERING_SIGNATURES (poll loop)
//!     → wait_for_block_number → build_cert → verify_cert
//! ```
//!
//! `wait_for_block_number` is skipped when the configured block poll
//! interval is zero. `build_cert` reads the certificate version of the
//! verifier active at the reference block and lays the certificate out
//! accordingly. A threshold read that fails after COMPLETE is reported as
//! `check_thresholds`, not as a polling failure.
//!
//! Stages run strictly in this order. Each chain or RPC call runs under
//! its own stage budget derived from the caller's budget, so a stage can
//! never outlive the caller's deadline and cancellation reaches whichever
//! stage is active.
//!
//! The disperser holds no per-call state. Any number of dispersals may
//! run concurrently; the stage timer is the only shared mutable state.

mod poll;

use crate::adapters::BlockNumberMonitor;
use crate::algorithms::check_rbn_recency;
use crate::budget::Budget;
use crate::config::DispersalConfig;
use crate::domain::{BlobKey, Certificate, Payload, StatusSnapshot};
use crate::error::{DispersalError, DispersalResult, ErrorKind, Stage};
use crate::metrics::{SequenceProbe, StageTimer};
use crate::ports::inbound::PayloadDispersalApi;
use crate::ports::outbound::{ChainReader, DisperseReply, DisperserClient, VerifyingAuthority};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Client-side dispersal engine.
pub struct PayloadDisperser<C, A>
where
    C: DisperserClient,
    A: VerifyingAuthority,
{
    config: DispersalConfig,
    client: Arc<C>,
    authority: Arc<A>,
    block_monitor: Arc<BlockNumberMonitor>,
    stage_timer: Arc<StageTimer>,
    closed: AtomicBool,
}

impl<C, A> PayloadDisperser<C, A>
where
    C: DisperserClient,
    A: VerifyingAuthority,
{
    /// Create a disperser. Fails on invalid configuration.
    ///
    /// `chain` backs the wait for each certificate's reference block,
    /// polled every `config.block_number_poll_interval`.
    pub fn new(
        config: DispersalConfig,
        client: Arc<C>,
        authority: Arc<A>,
        chain: Arc<dyn ChainReader>,
        stage_timer: Arc<StageTimer>,
    ) -> DispersalResult<Self> {
        config.validate()?;
        let block_monitor = Arc::new(BlockNumberMonitor::new(
            chain,
            config.block_number_poll_interval,
        ));
        Ok(Self {
            config,
            client,
            authority,
            block_monitor,
            stage_timer,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &DispersalConfig {
        &self.config
    }

    pub fn block_monitor(&self) -> &Arc<BlockNumberMonitor> {
        &self.block_monitor
    }

    pub fn stage_timer(&self) -> &Arc<StageTimer> {
        &self.stage_timer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn run_dispersal(
        &self,
        payload: Payload,
        budget: &Budget,
        probe: &mut SequenceProbe,
    ) -> DispersalResult<Certificate> {
        if self.is_closed() {
            return Err(DispersalError::Closed {
                stage: Stage::ConvertToBlob,
            });
        }

        // 1. Payload → blob. Pure, no I/O.
        probe.set_stage(Stage::ConvertToBlob.as_str());
        let blob = payload
            .to_blob(self.config.payload_form, self.config.max_blob_symbols)
            .map_err(|source| DispersalError::Payload {
                stage: Stage::ConvertToBlob,
                source,
            })?;

        // 2. Required quorums, re-read on every call.
        probe.set_stage(Stage::GetQuorums.as_str());
        let quorums = budget
            .stage(self.config.contract_call_timeout)
            .run(self.authority.required_quorums())
            .await
            .map_err(|e| DispersalError::budget(Stage::GetQuorums, e, None, None))?
            .map_err(|source| DispersalError::Authority {
                stage: Stage::GetQuorums,
                source,
            })?;
        debug!(?quorums, symbols = blob.len_symbols(), "Required quorums read");

        // 3. Submission. Not retried here.
        probe.set_stage(Stage::DisperseBlob.as_str());
        let reply = budget
            .stage(self.config.disperse_blob_timeout)
            .run(
                self.client
                    .disperse_blob(&blob, self.config.blob_version, &quorums),
            )
            .await
            .map_err(|e| DispersalError::budget(Stage::DisperseBlob, e, None, None))?
            .map_err(|source| DispersalError::Backend {
                stage: Stage::DisperseBlob,
                source,
            })?;

        probe.set_stage(Stage::VerifyBlobKey.as_str());
        let blob_key = verify_received_blob_key(&reply)?;
        Span::current().record("blob_key", field::display(blob_key));
        debug!(status = %reply.status, "Blob accepted by disperser");

        // 4. Poll until signed.
        let snapshot = self
            .poll_until_signed(&blob_key, reply.status, budget, probe)
            .await?;
        log_signing_percentages(&blob_key, &snapshot);

        // 5. Build.
        let certificate = self
            .build_certificate(&blob_key, snapshot, budget, probe)
            .await?;

        // 6. Verify.
        probe.set_stage(Stage::VerifyCert.as_str());
        budget
            .stage(self.config.contract_call_timeout)
            .run(self.authority.verify_certificate(&certificate))
            .await
            .map_err(|e| DispersalError::budget(Stage::VerifyCert, e, Some(blob_key), None))?
            .map_err(|source| DispersalError::Authority {
                stage: Stage::VerifyCert,
                source,
            })?;
        debug!(
            reference_block = certificate.reference_block_number(),
            "Certificate verified"
        );

        Ok(certificate)
    }

    async fn build_certificate(
        &self,
        blob_key: &BlobKey,
        snapshot: StatusSnapshot,
        budget: &Budget,
        probe: &mut SequenceProbe,
    ) -> DispersalResult<Certificate> {
        let malformed = |reason: &str| DispersalError::MalformedStatus {
            stage: Stage::BuildCert,
            blob_key: *blob_key,
            reason: reason.to_string(),
        };
        let signed_batch = snapshot
            .signed_batch
            .ok_or_else(|| malformed("missing signed batch"))?;
        let blob_inclusion_info = snapshot
            .blob_inclusion_info
            .ok_or_else(|| malformed("missing blob inclusion info"))?;
        let rbn = signed_batch.header.reference_block_number;

        if self.block_monitor.is_enabled() {
            probe.set_stage(Stage::WaitForBlockNumber.as_str());
            budget
                .stage(self.config.contract_call_timeout)
                .run(self.block_monitor.wait_for_block_number(rbn))
                .await
                .map_err(|e| {
                    DispersalError::budget(Stage::WaitForBlockNumber, e, Some(*blob_key), None)
                })?;
        }

        probe.set_stage(Stage::BuildCert.as_str());
        let version = budget
            .stage(self.config.contract_call_timeout)
            .run(self.authority.cert_version(rbn))
            .await
            .map_err(|e| DispersalError::budget(Stage::BuildCert, e, Some(*blob_key), None))?
            .map_err(|source| DispersalError::Authority {
                stage: Stage::BuildCert,
                source,
            })?;

        let non_signer_stakes_and_signature = budget
            .stage(self.config.contract_call_timeout)
            .run(self.authority.non_signer_stakes_and_signature(&signed_batch))
            .await
            .map_err(|e| DispersalError::budget(Stage::BuildCert, e, Some(*blob_key), None))?
            .map_err(|source| DispersalError::Authority {
                stage: Stage::BuildCert,
                source,
            })?;

        let certificate = Certificate {
            version,
            blob_inclusion_info,
            batch_header: signed_batch.header,
            non_signer_stakes_and_signature,
            signed_quorum_numbers: signed_batch.attestation.quorum_numbers,
        };
        debug!(
            reference_block = rbn,
            cert_version = version.code(),
            "Certificate built"
        );
        Ok(certificate)
    }
}

/// Recompute the key from the accepted header and compare with the
/// disperser's.
fn verify_received_blob_key(reply: &DisperseReply) -> DispersalResult<BlobKey> {
    let computed = reply.blob_header.blob_key();
    if computed != reply.blob_key {
        return Err(DispersalError::BlobKeyMismatch {
            stage: Stage::VerifyBlobKey,
            computed,
            reported: reply.blob_key,
        });
    }
    Ok(computed)
}

fn log_signing_percentages(blob_key: &BlobKey, snapshot: &StatusSnapshot) {
    let Some(batch) = &snapshot.signed_batch else {
        return;
    };
    let attestation = &batch.attestation;
    for (quorum, signed) in attestation
        .quorum_numbers
        .iter()
        .zip(&attestation.quorum_signed_percentages)
    {
        debug!(%blob_key, quorum, signed_percent = signed, "Quorum signing percentage");
    }
}

#[async_trait]
impl<C, A> PayloadDispersalApi for PayloadDisperser<C, A>
where
    C: DisperserClient + 'static,
    A: VerifyingAuthority + 'static,
{
    async fn disperse(&self, payload: Payload) -> DispersalResult<Certificate> {
        self.disperse_with_budget(payload, &Budget::unbounded()).await
    }

    async fn disperse_with_budget(
        &self,
        payload: Payload,
        budget: &Budget,
    ) -> DispersalResult<Certificate> {
        let span = info_span!(
            "disperse",
            request_id = %Uuid::new_v4(),
            payload_bytes = payload.len(),
            blob_version = self.config.blob_version,
            blob_key = field::Empty,
        );

        async {
            let budget = budget.stage_opt(self.config.overall_timeout());
            let mut probe = self.stage_timer.probe();
            let result = self.run_dispersal(payload, &budget, &mut probe).await;
            probe.end();

            match &result {
                Ok(cert) => info!(
                    reference_block = cert.reference_block_number(),
                    "Payload dispersed"
                ),
                Err(e) if matches!(e.kind(), ErrorKind::Cancelled | ErrorKind::DeadlineExceeded) => {
                    warn!(
                        stage = e.stage().map(|s| s.as_str()),
                        failover = e.should_failover(),
                        error = %e,
                        "Dispersal did not complete"
                    )
                }
                Err(e) => error!(
                    stage = e.stage().map(|s| s.as_str()),
                    kind = ?e.kind(),
                    failover = e.should_failover(),
                    error = %e,
                    "Dispersal failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn verify_certificate(&self, certificate: &Certificate) -> DispersalResult<()> {
        Budget::with_timeout(self.config.contract_call_timeout)
            .run(self.authority.verify_certificate(certificate))
            .await
            .map_err(|e| DispersalError::budget(Stage::VerifyCert, e, None, None))?
            .map_err(|source| DispersalError::Authority {
                stage: Stage::VerifyCert,
                source,
            })
    }

    async fn verify_certificate_for_inclusion(
        &self,
        certificate: &Certificate,
        inclusion_block: u64,
    ) -> DispersalResult<()> {
        check_rbn_recency(
            certificate.reference_block_number(),
            inclusion_block,
            self.config.rbn_recency_window,
        )
        .map_err(|source| DispersalError::Recency {
            stage: Stage::RecencyCheck,
            source,
        })?;
        self.verify_certificate(certificate).await
    }

    async fn close(&self) -> DispersalResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(DispersalError::Closed { stage: Stage::Close });
        }
        self.client
            .close()
            .await
            .map_err(|source| DispersalError::Backend {
                stage: Stage::Close,
                source,
            })?;
        info!("Payload disperser closed");
        Ok(())
    }
}
