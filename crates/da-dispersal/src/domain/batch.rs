//! # Batches, Attestations and Status Snapshots
//!
//! Values returned by the backend on every status poll. A snapshot is
//! produced fresh on each poll and never mutated.

use super::blob::{expect_items, BlobInclusionInfo, BlobStatus, QuorumId};
use primitive_types::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Header of the batch a blob was included in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchHeader {
    /// Merkle root over the blob certificates in the batch.
    pub batch_root: H256,
    /// Chain block against which stake and membership are evaluated (RBN).
    pub reference_block_number: u64,
}

impl Encodable for BatchHeader {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.batch_root);
        s.append(&self.reference_block_number);
    }
}

impl Decodable for BatchHeader {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 2)?;
        Ok(Self {
            batch_root: rlp.val_at(0)?,
            reference_block_number: rlp.val_at(1)?,
        })
    }
}

/// Aggregated signature and stake data for a batch.
///
/// `quorum_numbers[i]` has signed `quorum_signed_percentages[i]` percent of
/// its stake. The two vectors are expected to have equal length; the
/// threshold evaluator rejects snapshots where they do not.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub quorum_numbers: Vec<QuorumId>,
    pub quorum_signed_percentages: Vec<u8>,
    pub non_signer_pubkeys: Vec<Vec<u8>>,
    pub quorum_apks: Vec<Vec<u8>>,
    pub apk_g2: Vec<u8>,
    pub sigma: Vec<u8>,
}

impl Attestation {
    /// Signed percentage for `quorum`, if the attestation covers it.
    pub fn signed_percentage(&self, quorum: QuorumId) -> Option<u8> {
        self.quorum_numbers
            .iter()
            .position(|q| *q == quorum)
            .and_then(|idx| self.quorum_signed_percentages.get(idx).copied())
    }
}

impl Encodable for Attestation {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.quorum_numbers);
        s.append(&self.quorum_signed_percentages);
        s.append_list::<Vec<u8>, Vec<u8>>(&self.non_signer_pubkeys);
        s.append_list::<Vec<u8>, Vec<u8>>(&self.quorum_apks);
        s.append(&self.apk_g2);
        s.append(&self.sigma);
    }
}

impl Decodable for Attestation {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_items(rlp, 6)?;
        Ok(Self {
            quorum_numbers: rlp.val_at(0)?,
            quorum_signed_percentages: rlp.val_at(1)?,
            non_signer_pubkeys: rlp.list_at(2)?,
            quorum_apks: rlp.list_at(3)?,
            apk_g2: rlp.val_at(4)?,
            sigma: rlp.val_at(5)?,
        })
    }
}

/// Batch header together with its attestation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBatch {
    pub header: BatchHeader,
    pub attestation: Attestation,
}

/// One poll result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: BlobStatus,
    /// Present once the blob has been placed in a batch.
    pub signed_batch: Option<SignedBatch>,
    /// Present once the blob has been placed in a batch.
    pub blob_inclusion_info: Option<BlobInclusionInfo>,
}

impl StatusSnapshot {
    /// Snapshot carrying only a status, as returned before batching.
    pub fn pending(status: BlobStatus) -> Self {
        Self {
            status,
            signed_batch: None,
            blob_inclusion_info: None,
        }
    }

    pub fn reference_block_number(&self) -> Option<u64> {
        self.signed_batch
            .as_ref()
            .map(|batch| batch.header.reference_block_number)
    }
}
