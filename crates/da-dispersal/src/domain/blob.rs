//! # Blob Identity and Lifecycle
//!
//! Blob header, content-derived blob key, and the status values the
//! dispersal backend reports while a blob moves through the network.

use primitive_types::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Quorum identifier.
pub type QuorumId = u8;

/// Keccak-256 helper.
pub fn keccak256(bytes: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(bytes))
}

/// Content-derived identifier of a dispersed blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobKey(pub [u8; 32]);

impl BlobKey {
    /// Parse a key from a byte slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({self})")
    }
}

/// Lifecycle of a blob as reported by the backend.
///
/// ```text
/// QUEUED → ENCODED → GATHERING_SIGNATURES → COMPLETE
///    └─────────┴──────────────┴──────────→ FAILED
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlobStatus {
    #[default]
    Unknown,
    Queued,
    Encoded,
    GatheringSignatures,
    Complete,
    Failed,
}

impl BlobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Queued => "QUEUED",
            Self::Encoded => "ENCODED",
            Self::GatheringSignatures => "GATHERING_SIGNATURES",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        }
    }

    /// Statuses after which the backend will not make further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Backend is still working on the blob.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Encoded | Self::GatheringSignatures)
    }

    /// Position in the normal lifecycle; terminal statuses rank highest.
    pub fn progress(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Queued => 1,
            Self::Encoded => 2,
            Self::GatheringSignatures => 3,
            Self::Complete | Self::Failed => 4,
        }
    }

    /// A pending status ranked below `latest`, reported out of order.
    pub fn regresses_from(&self, latest: BlobStatus) -> bool {
        self.is_pending() && self.progress() < latest.progress()
    }
}

impl fmt::Display for BlobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polynomial commitments to a blob, produced by the encoder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobCommitment {
    pub commitment: Vec<u8>,
    pub length_commitment: Vec<u8>,
    pub length_proof: Vec<u8>,
    /// Blob length in symbols.
    pub length: u32,
}

impl Encodable for BlobCommitment {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.commitment);
        s.append(&self.length_commitment);
        s.append(&self.length_proof);
        s.append(&self.length);
    }
}

impl Decodable for BlobCommitment {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 4)?;
        Ok(Self {
            commitment: rlp.val_at(0)?,
            length_commitment: rlp.val_at(1)?,
            length_proof: rlp.val_at(2)?,
            length: rlp.val_at(3)?,
        })
    }
}

/// Header describing a blob. The blob key is derived from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHeader {
    pub version: u16,
    pub quorum_numbers: Vec<QuorumId>,
    pub commitment: BlobCommitment,
    pub payment_header_hash: H256,
}

impl BlobHeader {
    /// keccak256 of the header's canonical encoding.
    pub fn blob_key(&self) -> BlobKey {
        BlobKey(keccak256(&rlp::encode(self)).0)
    }
}

impl Encodable for BlobHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.version);
        s.append(&self.quorum_numbers);
        s.append(&self.commitment);
        s.append(&self.payment_header_hash);
    }
}

impl Decodable for BlobHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 4)?;
        Ok(Self {
            version: rlp.val_at(0)?,
            quorum_numbers: rlp.val_at(1)?,
            commitment: rlp.val_at(2)?,
            payment_header_hash: rlp.val_at(3)?,
        })
    }
}

/// Blob header plus the disperser's signature and relay routing keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobCertificate {
    pub blob_header: BlobHeader,
    pub signature: Vec<u8>,
    pub relay_keys: Vec<u32>,
}

impl Encodable for BlobCertificate {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.blob_header);
        s.append(&self.signature);
        s.append_list::<u32, u32>(&self.relay_keys);
    }
}

impl Decodable for BlobCertificate {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 3)?;
        Ok(Self {
            blob_header: rlp.val_at(0)?,
            signature: rlp.val_at(1)?,
            relay_keys: rlp.list_at(2)?,
        })
    }
}

/// Merkle inclusion of a blob certificate in a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInclusionInfo {
    pub blob_certificate: BlobCertificate,
    pub blob_index: u32,
    pub inclusion_proof: Vec<u8>,
}

impl Encodable for BlobInclusionInfo {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.blob_certificate);
        s.append(&self.blob_index);
        s.append(&self.inclusion_proof);
    }
}

impl Decodable for BlobInclusionInfo {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 3)?;
        Ok(Self {
            blob_certificate: rlp.val_at(0)?,
            blob_index: rlp.val_at(1)?,
            inclusion_proof: rlp.val_at(2)?,
        })
    }
}

/// Reject lists whose arity differs from the expected struct layout.
pub(crate) fn expect_items(rlp: &Rlp, expected: usize) -> Result<(), DecoderError> {
    if !rlp.is_list() {
        return Err(DecoderError::RlpExpectedToBeList);
    }
    if rlp.item_count()? != expected {
        return Err(DecoderError::RlpIncorrectListLen);
    }
    Ok(())
}
