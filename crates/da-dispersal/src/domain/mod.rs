//! Domain layer - pure types with no I/O.

pub mod authority;
pub mod batch;
pub mod blob;
pub mod certificate;
pub mod payload;

pub use authority::{Address, AuthorityActivation, AuthorityHistory, RouterError};
pub use batch::{Attestation, BatchHeader, SignedBatch, StatusSnapshot};
pub use blob::{
    keccak256, BlobCertificate, BlobCommitment, BlobHeader, BlobInclusionInfo, BlobKey,
    BlobStatus, QuorumId,
};
pub use certificate::{
    CertVersion, Certificate, CertificateCodecError, NonSignerStakesAndSignature,
};
pub use payload::{Blob, Payload, PayloadError, PolynomialForm};
