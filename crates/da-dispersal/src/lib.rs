//! # Payload Dispersal Engine
//!
//! Client-side engine for a data-availability network. Takes an opaque
//! payload, encodes it into a blob, submits it to a disperser, polls while
//! operator quorums attest, then builds and verifies an availability
//! certificate against the on-chain verifier.
//!
//! ## Architecture
//!
//! ```text
//! Payload ──→ PayloadDisperser ──disperse_blob──→ DisperserClient
//!                  │     ↑                             │
//!                  │     └────── StatusSnapshot ───────┘  (poll loop)
//!                  │
//!                  ├──threshold / build / verify──→ VerifyingAuthority
//!                  │                                   │
//!                  │                    AuthoritySource (fixed | routed)
//!                  ↓
//!             Certificate
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Description |
//! |-----------|-------------|
//! | Stage order | convert → quorums → submit → key check → poll → block wait → build → verify |
//! | Budgeted I/O | Every chain or RPC call is bounded by a stage budget under the caller's |
//! | No early certificate | A certificate is returned only after on-chain verification |
//! | Key integrity | The disperser's blob key must match the hash of the accepted header |
//! | Fresh thresholds | Thresholds are evaluated against each new snapshot, never the best seen |
//! | Versioned authority | Verification uses the authority active at the reference block |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Payloads, blobs, batches and certificates
//! - `algorithms/` - Threshold evaluation and recency checks
//! - `ports/` - Inbound API, outbound client/chain/authority traits
//! - `adapters/` - Certificate verifier, authority router, block monitor, mocks
//! - `service/` - The dispersal orchestrator
//! - `budget` - Deadlines and cancellation
//! - `metrics` - Per-stage timing
//!
//! ## Usage
//!
//! ```ignore
//! use da_dispersal::{DispersalConfig, PayloadDisperser, PayloadDispersalApi, StageTimer};
//!
//! let timer = Arc::new(StageTimer::new("da", None)?);
//! let config = DispersalConfig::from_env();
//! let disperser = PayloadDisperser::new(config, client, authority, chain, timer)?;
//!
//! let cert = disperser.disperse(Payload::new(data)).await?;
//! let bytes = cert.to_bytes();
//! ```

pub mod adapters;
pub mod algorithms;
pub mod budget;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use budget::{Budget, BudgetError};
pub use config::DispersalConfig;
pub use domain::{
    BlobKey, BlobStatus, CertVersion, Certificate, Payload, PayloadError, PolynomialForm,
    StatusSnapshot,
};
pub use error::{DispersalError, DispersalResult, ErrorKind, Stage};
pub use metrics::{SequenceProbe, StageTimer};
pub use ports::inbound::PayloadDispersalApi;
pub use ports::outbound::{
    AuthorityRouter, CertVerifierContract, ChainReader, DisperserClient, VerifyingAuthority,
};
pub use service::PayloadDisperser;
