//! # Availability Certificate
//!
//! Self-contained proof that a payload was made available: batch header,
//! blob inclusion proof, and the non-signer data that makes the quorum
//! attestation checkable on-chain.
//!
//! ## Encoding
//!
//! Certificates round-trip through canonical RLP, led by the
//! [`CertVersion`] code so a reader knows the layout before decoding it.
//! Decoding is strict: unknown versions, wrong list arity and trailing
//! bytes are all rejected, so `encode(decode(bytes)) == bytes` for every
//! accepted input.

use super::batch::BatchHeader;
use super::blob::{expect_items, BlobInclusionInfo, QuorumId};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors decoding a certificate from bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateCodecError {
    #[error("certificate is not valid RLP: {0}")]
    Malformed(String),

    #[error("certificate has {trailing} trailing bytes")]
    TrailingBytes { trailing: usize },

    #[error("certificate is empty")]
    Empty,

    #[error("unsupported certificate version {0}")]
    UnsupportedVersion(u8),
}

impl From<DecoderError> for CertificateCodecError {
    fn from(err: DecoderError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Aggregate of non-signer stakes and the quorum signature, read from the
/// chain at the batch's reference block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonSignerStakesAndSignature {
    pub non_signer_quorum_bitmap_indices: Vec<u32>,
    pub non_signer_pubkeys: Vec<Vec<u8>>,
    pub quorum_apks: Vec<Vec<u8>>,
    pub apk_g2: Vec<u8>,
    pub sigma: Vec<u8>,
    pub quorum_apk_indices: Vec<u32>,
    pub total_stake_indices: Vec<u32>,
    pub non_signer_stake_indices: Vec<Vec<u32>>,
}

impl Encodable for NonSignerStakesAndSignature {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(8);
        s.append_list::<u32, u32>(&self.non_signer_quorum_bitmap_indices);
        s.append_list::<Vec<u8>, Vec<u8>>(&self.non_signer_pubkeys);
        s.append_list::<Vec<u8>, Vec<u8>>(&self.quorum_apks);
        s.append(&self.apk_g2);
        s.append(&self.sigma);
        s.append_list::<u32, u32>(&self.quorum_apk_indices);
        s.append_list::<u32, u32>(&self.total_stake_indices);
        s.begin_list(self.non_signer_stake_indices.len());
        for indices in &self.non_signer_stake_indices {
            s.append_list::<u32, u32>(indices);
        }
    }
}

impl Decodable for NonSignerStakesAndSignature {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 8)?;
        let nested = rlp.at(7)?;
        if !nested.is_list() {
            return Err(DecoderError::RlpExpectedToBeList);
        }
        let non_signer_stake_indices = nested
            .iter()
            .map(|item| item.as_list::<u32>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            non_signer_quorum_bitmap_indices: rlp.list_at(0)?,
            non_signer_pubkeys: rlp.list_at(1)?,
            quorum_apks: rlp.list_at(2)?,
            apk_g2: rlp.val_at(3)?,
            sigma: rlp.val_at(4)?,
            quorum_apk_indices: rlp.list_at(5)?,
            total_stake_indices: rlp.list_at(6)?,
            non_signer_stake_indices,
        })
    }
}

/// Certificate layout understood by a verifier contract, read from its
/// `certVersion()` view.
///
/// V2 leads with the inclusion info; V3 onward lead with the batch header.
/// V4 appends the offchain derivation version the verifier was deployed
/// with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertVersion {
    V2,
    #[default]
    V3,
    V4 { offchain_derivation_version: u16 },
}

impl CertVersion {
    pub const V2_CODE: u8 = 2;
    pub const V3_CODE: u8 = 3;
    pub const V4_CODE: u8 = 4;

    pub fn code(&self) -> u8 {
        match self {
            Self::V2 => Self::V2_CODE,
            Self::V3 => Self::V3_CODE,
            Self::V4 { .. } => Self::V4_CODE,
        }
    }

    pub fn offchain_derivation_version(&self) -> Option<u16> {
        match self {
            Self::V4 {
                offchain_derivation_version,
            } => Some(*offchain_derivation_version),
            _ => None,
        }
    }

    /// RLP list arity of a certificate with this version code.
    fn item_count(code: u8) -> Option<usize> {
        match code {
            Self::V2_CODE | Self::V3_CODE => Some(5),
            Self::V4_CODE => Some(6),
            _ => None,
        }
    }

    fn rlp_items(&self) -> usize {
        match self {
            Self::V2 | Self::V3 => 5,
            Self::V4 { .. } => 6,
        }
    }
}

/// Availability certificate handed back to the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub version: CertVersion,
    pub blob_inclusion_info: BlobInclusionInfo,
    pub batch_header: BatchHeader,
    pub non_signer_stakes_and_signature: NonSignerStakesAndSignature,
    pub signed_quorum_numbers: Vec<QuorumId>,
}

impl Certificate {
    /// Reference block number the attestation was produced against.
    pub fn reference_block_number(&self) -> u64 {
        self.batch_header.reference_block_number
    }

    /// Canonical binary encoding, tagged with the version code.
    pub fn to_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Strict inverse of [`Certificate::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateCodecError> {
        if bytes.is_empty() {
            return Err(CertificateCodecError::Empty);
        }
        let rlp = Rlp::new(bytes);
        let info = rlp.payload_info()?;
        let consumed = info.header_len + info.value_len;
        if consumed < bytes.len() {
            return Err(CertificateCodecError::TrailingBytes {
                trailing: bytes.len() - consumed,
            });
        }
        let code: u8 = rlp.val_at(0)?;
        if CertVersion::item_count(code).is_none() {
            return Err(CertificateCodecError::UnsupportedVersion(code));
        }
        Ok(rlp.as_val()?)
    }
}

impl Encodable for Certificate {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(self.version.rlp_items());
        s.append(&self.version.code());
        match self.version {
            CertVersion::V2 => {
                s.append(&self.blob_inclusion_info);
                s.append(&self.batch_header);
            }
            CertVersion::V3 | CertVersion::V4 { .. } => {
                s.append(&self.batch_header);
                s.append(&self.blob_inclusion_info);
            }
        }
        s.append(&self.non_signer_stakes_and_signature);
        s.append(&self.signed_quorum_numbers);
        if let Some(derivation) = self.version.offchain_derivation_version() {
            s.append(&derivation);
        }
    }
}

impl Decodable for Certificate {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let code: u8 = rlp.val_at(0)?;
        let items = CertVersion::item_count(code)
            .ok_or(DecoderError::Custom("unsupported certificate version"))?;
        expect_items(rlp, items)?;

        let (version, blob_inclusion_info, batch_header) = match code {
            CertVersion::V2_CODE => (CertVersion::V2, rlp.val_at(1)?, rlp.val_at(2)?),
            CertVersion::V3_CODE => (CertVersion::V3, rlp.val_at(2)?, rlp.val_at(1)?),
            _ => (
                CertVersion::V4 {
                    offchain_derivation_version: rlp.val_at(5)?,
                },
                rlp.val_at(2)?,
                rlp.val_at(1)?,
            ),
        };
        Ok(Self {
            version,
            blob_inclusion_info,
            batch_header,
            non_signer_stakes_and_signature: rlp.val_at(3)?,
            signed_quorum_numbers: rlp.val_at(4)?,
        })
    }
}
