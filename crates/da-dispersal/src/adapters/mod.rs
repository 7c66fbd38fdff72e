//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of the outbound ports.

pub mod block_monitor;
pub mod cert_verifier;
pub mod mock;
pub mod router;

pub use block_monitor::BlockNumberMonitor;
pub use cert_verifier::{AuthoritySource, CertVerifier};
pub use mock::{
    signed_snapshot, ManualChainReader, MockCertVerifierContract, ScriptedDisperserClient,
    Submission,
};
pub use router::InMemoryAuthorityRouter;
