//! # Threshold Evaluator
//!
//! Pure check of a status snapshot: every quorum named in the blob header
//! must have signed at least the confirmation threshold.
//!
//! ## Rules
//!
//! - The blob's own quorum set comes from the header in the inclusion info,
//!   not from the attestation.
//! - A quorum missing from the attestation counts as 0% signed.
//! - Each call looks only at the snapshot it is given. A lower percentage
//!   on a later poll is reported as a shortfall.
//! - Malformed snapshots are reported separately from shortfalls so the
//!   poll loop can tell "not yet" from "cannot check".

use crate::domain::{QuorumId, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Per-quorum shortfall detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumShortfall {
    pub quorum: QuorumId,
    pub required: u8,
    pub signed: u8,
}

/// Quorums that have not reached the confirmation threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdShortfall {
    pub quorums: Vec<QuorumShortfall>,
}

impl fmt::Display for ThresholdShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("confirmation threshold not met:")?;
        for (i, q) in self.quorums.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(
                f,
                "{sep}quorum {} signed {}% (required {}%)",
                q.quorum, q.signed, q.required
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ThresholdShortfall {}

/// Evaluator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error(transparent)]
    Shortfall(#[from] ThresholdShortfall),

    #[error("malformed status snapshot: {0}")]
    Malformed(String),

    #[error("confirmation threshold {0}% exceeds 100%")]
    InvalidThreshold(u8),
}

impl ThresholdError {
    pub fn is_shortfall(&self) -> bool {
        matches!(self, Self::Shortfall(_))
    }
}

/// Check every blob quorum against `confirmation_threshold` percent.
pub fn evaluate_thresholds(
    snapshot: &StatusSnapshot,
    confirmation_threshold: u8,
) -> Result<(), ThresholdError> {
    if confirmation_threshold > 100 {
        return Err(ThresholdError::InvalidThreshold(confirmation_threshold));
    }

    let batch = snapshot
        .signed_batch
        .as_ref()
        .ok_or_else(|| ThresholdError::Malformed("missing signed batch".into()))?;
    let inclusion = snapshot
        .blob_inclusion_info
        .as_ref()
        .ok_or_else(|| ThresholdError::Malformed("missing blob inclusion info".into()))?;

    let attestation = &batch.attestation;
    if attestation.quorum_numbers.len() != attestation.quorum_signed_percentages.len() {
        return Err(ThresholdError::Malformed(format!(
            "attestation has {} quorums but {} signed percentages",
            attestation.quorum_numbers.len(),
            attestation.quorum_signed_percentages.len()
        )));
    }

    let blob_quorums = &inclusion.blob_certificate.blob_header.quorum_numbers;
    if blob_quorums.is_empty() {
        return Err(ThresholdError::Malformed(
            "blob header names no quorums".into(),
        ));
    }

    let quorums: Vec<QuorumShortfall> = blob_quorums
        .iter()
        .map(|&quorum| QuorumShortfall {
            quorum,
            required: confirmation_threshold,
            signed: attestation.signed_percentage(quorum).unwrap_or(0),
        })
        .filter(|q| q.signed < q.required)
        .collect();

    if quorums.is_empty() {
        Ok(())
    } else {
        Err(ThresholdShortfall { quorums }.into())
    }
}
