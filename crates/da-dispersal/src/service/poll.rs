//! Status polling for a submitted blob.
//!
//! Polls on a fixed tick until the blob is signed well enough to certify,
//! the backend reports a failure-class status, or the completion budget
//! runs out. Transient poll errors never end the loop.

use super::PayloadDisperser;
use crate::algorithms::{evaluate_thresholds, ThresholdError};
use crate::budget::{Budget, BudgetError};
use crate::domain::{BlobKey, BlobStatus, StatusSnapshot};
use crate::error::{DispersalError, DispersalResult, Stage};
use crate::metrics::SequenceProbe;
use crate::ports::outbound::{DisperserClient, VerificationError, VerifyingAuthority};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Why a threshold check did not pass.
#[derive(Debug)]
enum CheckFailure {
    Threshold(ThresholdError),
    Authority(VerificationError),
    Budget(BudgetError),
}

impl CheckFailure {
    fn is_shortfall(&self) -> bool {
        matches!(self, Self::Threshold(e) if e.is_shortfall())
    }

    /// Shortfalls and malformed snapshots are about the blob and belong to
    /// the poll stage. A failed threshold read is a chain problem and gets
    /// its own stage, unless the poll budget itself ran out.
    fn into_error(
        self,
        blob_key: BlobKey,
        last_status: BlobStatus,
        poll_budget: &Budget,
    ) -> DispersalError {
        match self {
            Self::Threshold(ThresholdError::Shortfall(shortfall)) => {
                DispersalError::ThresholdShortfall {
                    stage: Stage::PollStatus,
                    blob_key,
                    shortfall,
                }
            }
            Self::Threshold(other) => DispersalError::MalformedStatus {
                stage: Stage::PollStatus,
                blob_key,
                reason: other.to_string(),
            },
            Self::Authority(source) => DispersalError::Authority {
                stage: Stage::CheckThresholds,
                source,
            },
            Self::Budget(e) => {
                let stage = if poll_budget.is_cancelled() || poll_budget.is_expired() {
                    Stage::PollStatus
                } else {
                    Stage::CheckThresholds
                };
                DispersalError::budget(stage, e, Some(blob_key), Some(last_status))
            }
        }
    }
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Threshold(e) => write!(f, "{e}"),
            Self::Authority(e) => write!(f, "{e}"),
            Self::Budget(e) => write!(f, "{e}"),
        }
    }
}

impl<C, A> PayloadDisperser<C, A>
where
    C: DisperserClient,
    A: VerifyingAuthority,
{
    /// Poll `blob_key` until its attestation meets the confirmation
    /// threshold and return the snapshot to certify.
    ///
    /// The first poll happens one interval after entry.
    pub(super) async fn poll_until_signed(
        &self,
        blob_key: &BlobKey,
        initial_status: BlobStatus,
        parent: &Budget,
        probe: &mut SequenceProbe,
    ) -> DispersalResult<StatusSnapshot> {
        let budget = parent.stage(self.config.blob_complete_timeout);
        let period = self.config.blob_status_poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_status = initial_status;
        probe.set_stage(BlobStatus::Queued.as_str());

        loop {
            budget.run(ticker.tick()).await.map_err(|e| {
                DispersalError::budget(Stage::PollStatus, e, Some(*blob_key), Some(last_status))
            })?;

            let polled = budget
                .run(self.client.blob_status(blob_key))
                .await
                .map_err(|e| {
                    DispersalError::budget(Stage::PollStatus, e, Some(*blob_key), Some(last_status))
                })?;
            let snapshot = match polled {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    debug!(%blob_key, error = %err, "Blob status poll failed, retrying");
                    continue;
                }
            };

            if snapshot.status.regresses_from(last_status) {
                debug!(
                    %blob_key,
                    latest = %last_status,
                    status = %snapshot.status,
                    "Ignoring out-of-order blob status"
                );
                continue;
            }
            if snapshot.status != last_status {
                debug!(
                    %blob_key,
                    previous = %last_status,
                    status = %snapshot.status,
                    "Blob status changed"
                );
                last_status = snapshot.status;
            }

            match snapshot.status {
                BlobStatus::Complete => {
                    return match self.check_thresholds(&snapshot, &budget).await {
                        Ok(()) => Ok(snapshot),
                        Err(failure) => Err(failure.into_error(*blob_key, last_status, &budget)),
                    };
                }
                BlobStatus::Queued | BlobStatus::Encoded => {
                    probe.set_stage(snapshot.status.as_str());
                }
                BlobStatus::GatheringSignatures => {
                    probe.set_stage(snapshot.status.as_str());
                    match self.check_thresholds(&snapshot, &budget).await {
                        Ok(()) => {
                            debug!(%blob_key, "Confirmation threshold met before completion");
                            return Ok(snapshot);
                        }
                        Err(failure) if failure.is_shortfall() => {
                            debug!(%blob_key, %failure, "Still gathering signatures");
                        }
                        Err(failure @ CheckFailure::Budget(_))
                            if budget.is_cancelled() || budget.is_expired() =>
                        {
                            return Err(failure.into_error(*blob_key, last_status, &budget));
                        }
                        Err(failure) => {
                            warn!(%blob_key, %failure, "Unexpected threshold check failure while gathering signatures");
                        }
                    }
                }
                status => {
                    error!(%blob_key, %status, "Blob reached terminal failure status");
                    return Err(DispersalError::TerminalStatus {
                        stage: Stage::PollStatus,
                        blob_key: *blob_key,
                        status,
                    });
                }
            }
        }
    }

    /// Read the confirmation threshold for the snapshot's reference block
    /// and evaluate every blob quorum against it.
    async fn check_thresholds(
        &self,
        snapshot: &StatusSnapshot,
        budget: &Budget,
    ) -> Result<(), CheckFailure> {
        let rbn = snapshot.reference_block_number().ok_or_else(|| {
            CheckFailure::Threshold(ThresholdError::Malformed("missing signed batch".into()))
        })?;
        let threshold = budget
            .stage(self.config.contract_call_timeout)
            .run(self.authority.confirmation_threshold(rbn))
            .await
            .map_err(CheckFailure::Budget)?
            .map_err(CheckFailure::Authority)?;
        evaluate_thresholds(snapshot, threshold).map_err(CheckFailure::Threshold)
    }
}
