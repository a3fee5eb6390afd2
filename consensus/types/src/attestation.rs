use bitvec::prelude::{BitVec, Lsb0};
use eth2_hashing::hash;
use serde_derive::{Deserialize, Serialize};

use crate::{Checkpoint, CommitteeIndex, Hash256, Slot, ValidatorIndex};

/// The body of an attestation: what is being attested to, independent of
/// which validator(s) are attesting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub beacon_block_root: Hash256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

impl AttestationData {
    /// Stand-in for SSZ tree-hashing, used as the key for duplicate
    /// suppression and aggregation bucketing (mirrors the teacher's use of
    /// `attestation.data.tree_hash_root()` as an aggregation-pool map key in
    /// `naive_aggregation_pool.rs`).
    pub fn tree_hash_root(&self) -> Hash256 {
        let mut bytes = Vec::with_capacity(8 + 8 + 32 + 40 + 40);
        bytes.extend_from_slice(&self.slot.as_u64().to_le_bytes());
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(self.beacon_block_root.as_bytes());
        bytes.extend_from_slice(&self.source.epoch.as_u64().to_le_bytes());
        bytes.extend_from_slice(self.source.root.as_bytes());
        bytes.extend_from_slice(&self.target.epoch.as_u64().to_le_bytes());
        bytes.extend_from_slice(self.target.root.as_bytes());
        Hash256::from_slice(&hash(&bytes))
    }
}

/// A stub standing in for the teacher's `bls::AggregateSignature`: BLS
/// signature math is an explicit trait-boundary out-of-scope item, so this
/// only carries bytes around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AggregateSignature(Vec<u8>);

impl AggregateSignature {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A (possibly aggregated) attestation gossiped by the network, carrying a
/// bitfield of which committee members contributed to `signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: BitVec<Lsb0, u8>,
    pub data: AttestationData,
    pub signature: AggregateSignature,
}

impl Attestation {
    /// Number of validators represented in `aggregation_bits`, mirroring the
    /// teacher's `attestation.aggregation_bits.num_set_bits()` calls in
    /// `attestation_verification.rs`.
    pub fn num_set_bits(&self) -> usize {
        self.aggregation_bits.count_ones()
    }

    pub fn is_aggregated(&self) -> bool {
        self.num_set_bits() > 1
    }
}

/// The fully-expanded form of an `Attestation`: the committee bitfield has
/// been resolved into concrete validator indices. Produced by the Attestation
/// Validators (component B) once committee membership is known, and is what
/// the Fork-Choice Gateway actually applies as LMD-GHOST votes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedAttestation {
    pub attesting_indices: Vec<ValidatorIndex>,
    pub data: AttestationData,
    pub signature: AggregateSignature,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Epoch;

    fn data() -> AttestationData {
        AttestationData {
            slot: Slot::new(1),
            index: 0,
            beacon_block_root: Hash256::zero(),
            source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            target: Checkpoint::new(Epoch::new(1), Hash256::repeat_byte(9)),
        }
    }

    #[test]
    fn tree_hash_root_is_deterministic() {
        assert_eq!(data().tree_hash_root(), data().tree_hash_root());
    }

    #[test]
    fn num_set_bits_counts_aggregation() {
        let mut bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 8);
        bits.set(0, true);
        bits.set(3, true);
        let attestation = Attestation {
            aggregation_bits: bits,
            data: data(),
            signature: AggregateSignature::empty(),
        };
        assert_eq!(attestation.num_set_bits(), 2);
        assert!(attestation.is_aggregated());
    }
}
