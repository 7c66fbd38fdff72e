//! # Reference Block Recency
//!
//! A certificate admitted into a downstream pipeline at block
//! `inclusion_block` must have been attested recently enough:
//! `inclusion_block <= rbn + window`.
//!
//! The check is skipped when `inclusion_block` or `window` is zero.

use thiserror::Error;

/// Recency check failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecencyError {
    /// Certificate is too old for the pipeline. Resubmitting a fresh
    /// certificate resolves it; re-verifying this one does not.
    #[error(
        "certificate reference block {rbn} is stale: inclusion block {inclusion_block} > {rbn} + window {window}"
    )]
    Stale {
        rbn: u64,
        inclusion_block: u64,
        window: u64,
    },

    /// Inputs that cannot occur for a genuinely attested certificate.
    #[error("invalid recency inputs (rbn {rbn}, inclusion block {inclusion_block}): {reason}")]
    Logic {
        rbn: u64,
        inclusion_block: u64,
        reason: &'static str,
    },
}

impl RecencyError {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Check that a certificate with reference block `rbn`, included at
/// `inclusion_block`, is within `window` blocks.
pub fn check_rbn_recency(rbn: u64, inclusion_block: u64, window: u64) -> Result<(), RecencyError> {
    if inclusion_block == 0 || window == 0 {
        return Ok(());
    }
    if rbn == 0 {
        return Err(RecencyError::Logic {
            rbn,
            inclusion_block,
            reason: "reference block number is zero",
        });
    }
    // Validators only sign over past blocks, so inclusion is strictly later.
    if inclusion_block <= rbn {
        return Err(RecencyError::Logic {
            rbn,
            inclusion_block,
            reason: "inclusion block is not after the reference block",
        });
    }
    if inclusion_block > rbn.saturating_add(window) {
        return Err(RecencyError::Stale {
            rbn,
            inclusion_block,
            window,
        });
    }
    Ok(())
}
