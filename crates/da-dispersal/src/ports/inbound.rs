//! Driving Ports (API - Inbound)
//!
//! The surface callers use to disperse payloads and check certificates.

use crate::budget::Budget;
use crate::domain::{Certificate, Payload};
use crate::error::DispersalResult;
use async_trait::async_trait;

/// Payload dispersal API.
///
/// Implementations are safe for any number of concurrent calls.
#[async_trait]
pub trait PayloadDispersalApi: Send + Sync {
    /// Disperse `payload` and return a certificate that has already passed
    /// on-chain verification.
    async fn disperse(&self, payload: Payload) -> DispersalResult<Certificate>;

    /// Like [`PayloadDispersalApi::disperse`], bounded by a caller budget.
    async fn disperse_with_budget(
        &self,
        payload: Payload,
        budget: &Budget,
    ) -> DispersalResult<Certificate>;

    /// Check a certificate against the verifying authority active at its
    /// reference block.
    async fn verify_certificate(&self, certificate: &Certificate) -> DispersalResult<()>;

    /// Recency check against `inclusion_block`, then on-chain verification.
    async fn verify_certificate_for_inclusion(
        &self,
        certificate: &Certificate,
        inclusion_block: u64,
    ) -> DispersalResult<()>;

    /// Release held client connections. Succeeds exactly once.
    async fn close(&self) -> DispersalResult<()>;
}
