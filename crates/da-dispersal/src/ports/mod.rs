//! # Ports Layer (Hexagonal Architecture)
//!
//! - `inbound`: what callers drive.
//! - `outbound`: what the engine depends on.

pub mod inbound;
pub mod outbound;

pub use inbound::PayloadDispersalApi;
pub use outbound::{
    AuthorityRouter, CertVerifierContract, ChainError, ChainReader, CheckDaCertStatus,
    ClientError, DisperseReply, DisperserClient, VerificationError, VerifyingAuthority,
};
