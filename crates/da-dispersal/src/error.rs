//! Error types for the dispersal engine
//!
//! Every failure carries the [`Stage`] it happened in. Callers branch on
//! [`DispersalError::kind`] rather than on message text.

use crate::algorithms::{RecencyError, ThresholdShortfall};
use crate::budget::BudgetError;
use crate::domain::{BlobKey, BlobStatus, PayloadError};
use crate::ports::outbound::{ClientError, VerificationError};
use std::fmt;
use thiserror::Error;

/// Named stage of one dispersal, used for errors, logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ConvertToBlob,
    GetQuorums,
    DisperseBlob,
    VerifyBlobKey,
    PollStatus,
    CheckThresholds,
    WaitForBlockNumber,
    BuildCert,
    VerifyCert,
    RecencyCheck,
    Close,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConvertToBlob => "convert_to_blob",
            Self::GetQuorums => "get_quorums",
            Self::DisperseBlob => "disperse_blob",
            Self::VerifyBlobKey => "verify_blob_key",
            Self::PollStatus => "poll_status",
            Self::CheckThresholds => "check_thresholds",
            Self::WaitForBlockNumber => "wait_for_block_number",
            Self::BuildCert => "build_cert",
            Self::VerifyCert => "verify_cert",
            Self::RecencyCheck => "recency_check",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed taxonomy of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed payload or configuration. No network I/O was performed.
    Input,
    /// Backend call failed at the transport level.
    TransientBackend,
    /// Backend refused the submission or returned inconsistent data.
    Submission,
    /// Quorums did not reach the confirmation threshold after completion.
    ThresholdShortfall,
    /// Backend reported a failure-class status.
    TerminalBackend,
    DeadlineExceeded,
    Cancelled,
    /// Certificate failed on-chain verification.
    InvalidCertificate,
    /// A chain read could not be performed.
    ChainUnavailable,
    /// Certificate is too old for the inclusion point.
    Recency,
    /// Disperser already closed.
    Closed,
}

/// Dispersal errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispersalError {
    #[error("{stage}: invalid payload: {source}")]
    Payload {
        stage: Stage,
        #[source]
        source: PayloadError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{stage}: payload disperser is closed")]
    Closed { stage: Stage },

    #[error("{stage}: dispersal backend: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: ClientError,
    },

    #[error("{stage}: verifying authority: {source}")]
    Authority {
        stage: Stage,
        #[source]
        source: VerificationError,
    },

    #[error("{stage}: blob key mismatch: computed {computed}, disperser returned {reported}")]
    BlobKeyMismatch {
        stage: Stage,
        computed: BlobKey,
        reported: BlobKey,
    },

    #[error("{stage}: blob {blob_key} reached terminal status {status}")]
    TerminalStatus {
        stage: Stage,
        blob_key: BlobKey,
        status: BlobStatus,
    },

    #[error("{stage}: blob {blob_key}: {shortfall}")]
    ThresholdShortfall {
        stage: Stage,
        blob_key: BlobKey,
        shortfall: ThresholdShortfall,
    },

    #[error("{stage}: blob {blob_key}: malformed status: {reason}")]
    MalformedStatus {
        stage: Stage,
        blob_key: BlobKey,
        reason: String,
    },

    #[error("{stage}: deadline exceeded{}", describe_progress(.blob_key, .last_status))]
    DeadlineExceeded {
        stage: Stage,
        blob_key: Option<BlobKey>,
        last_status: Option<BlobStatus>,
    },

    #[error("{stage}: cancelled")]
    Cancelled { stage: Stage },

    #[error("{stage}: {source}")]
    Recency {
        stage: Stage,
        #[source]
        source: RecencyError,
    },
}

fn describe_progress(blob_key: &Option<BlobKey>, last_status: &Option<BlobStatus>) -> String {
    match (blob_key, last_status) {
        (Some(key), Some(status)) => format!(" (blob {key}, last status {status})"),
        (Some(key), None) => format!(" (blob {key})"),
        (None, Some(status)) => format!(" (last status {status})"),
        (None, None) => String::new(),
    }
}

impl DispersalError {
    /// Map a budget failure to a stage error.
    pub fn budget(
        stage: Stage,
        err: BudgetError,
        blob_key: Option<BlobKey>,
        last_status: Option<BlobStatus>,
    ) -> Self {
        match err {
            BudgetError::Cancelled => Self::Cancelled { stage },
            BudgetError::DeadlineExceeded => Self::DeadlineExceeded {
                stage,
                blob_key,
                last_status,
            },
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Config(_) => None,
            Self::Payload { stage, .. }
            | Self::Closed { stage }
            | Self::Backend { stage, .. }
            | Self::Authority { stage, .. }
            | Self::BlobKeyMismatch { stage, .. }
            | Self::TerminalStatus { stage, .. }
            | Self::ThresholdShortfall { stage, .. }
            | Self::MalformedStatus { stage, .. }
            | Self::DeadlineExceeded { stage, .. }
            | Self::Cancelled { stage }
            | Self::Recency { stage, .. } => Some(*stage),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Payload { .. } | Self::Config(_) => ErrorKind::Input,
            Self::Closed { .. } => ErrorKind::Closed,
            Self::Backend { source, .. } => match source {
                ClientError::Transport(_) => ErrorKind::TransientBackend,
                ClientError::Rejected(_) => ErrorKind::Submission,
                ClientError::Closed => ErrorKind::Closed,
            },
            Self::Authority { source, .. } => match source {
                VerificationError::InvalidCertificate { .. } => ErrorKind::InvalidCertificate,
                _ => ErrorKind::ChainUnavailable,
            },
            Self::BlobKeyMismatch { .. } => ErrorKind::Submission,
            Self::TerminalStatus { .. } | Self::MalformedStatus { .. } => {
                ErrorKind::TerminalBackend
            }
            Self::ThresholdShortfall { .. } => ErrorKind::ThresholdShortfall,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Recency { source, .. } => match source {
                RecencyError::Stale { .. } => ErrorKind::Recency,
                RecencyError::Logic { .. } => ErrorKind::Input,
            },
        }
    }

    /// Whether the caller should fall back to another data-availability
    /// layer instead of retrying this one.
    pub fn should_failover(&self) -> bool {
        match self {
            Self::TerminalStatus { .. } | Self::ThresholdShortfall { .. } => true,
            Self::DeadlineExceeded { stage, .. } => *stage == Stage::PollStatus,
            Self::Authority { source, .. } => source.is_invalid_certificate(),
            _ => false,
        }
    }

    pub fn blob_key(&self) -> Option<BlobKey> {
        match self {
            Self::TerminalStatus { blob_key, .. }
            | Self::ThresholdShortfall { blob_key, .. }
            | Self::MalformedStatus { blob_key, .. } => Some(*blob_key),
            Self::BlobKeyMismatch { reported, .. } => Some(*reported),
            Self::DeadlineExceeded { blob_key, .. } => *blob_key,
            _ => None,
        }
    }
}

/// Result type for dispersal operations
pub type DispersalResult<T> = Result<T, DispersalError>;
