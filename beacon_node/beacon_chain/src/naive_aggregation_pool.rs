//! *AggregatingAttestationPool* (spec §3): an append-per-slot pool of
//! attestations available for block production, trimmed by finality.
//! Adapted from the teacher's `naive_aggregation_pool.rs`, dropping the
//! `EthSpec` generic (this workspace's `Attestation` isn't generic over it)
//! and replacing `Attestation::aggregate` (BLS-backed in the teacher) with a
//! bitwise-OR over `aggregation_bits`, since signature aggregation itself is
//! out of scope.

use crate::metrics;
use std::collections::HashMap;
use types::{Attestation, Hash256, Slot};

type AttestationDataRoot = Hash256;

/// The number of slots retained by the pool before the oldest is pruned.
const SLOTS_RETAINED: usize = 3;

/// DoS protection: the maximum number of distinct `AttestationData` stored per slot.
const MAX_ATTESTATIONS_PER_SLOT: usize = 16_384;

#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    NewAttestationData { committee_index: usize },
    SignatureAlreadyKnown { committee_index: usize },
    SignatureAggregated { committee_index: usize },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    SlotTooLow {
        slot: Slot,
        lowest_permissible_slot: Slot,
    },
    NoAggregationBitsSet,
    MoreThanOneAggregationBitSet(usize),
    ReachedMaxAttestationsPerSlot(usize),
    InconsistentBitfieldLengths,
}

/// All attestations sharing one slot, keyed by `attestation.data`.
struct AggregatedAttestationMap {
    map: HashMap<AttestationDataRoot, Attestation>,
}

impl AggregatedAttestationMap {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    fn insert(&mut self, a: &Attestation) -> Result<InsertOutcome, Error> {
        let set_bits: Vec<usize> = a
            .aggregation_bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(i, _)| i)
            .collect();

        let committee_index = *set_bits.first().ok_or(Error::NoAggregationBitsSet)?;
        if set_bits.len() > 1 {
            return Err(Error::MoreThanOneAggregationBitSet(set_bits.len()));
        }

        let root = a.data.tree_hash_root();

        if let Some(existing) = self.map.get_mut(&root) {
            if existing.aggregation_bits.len() != a.aggregation_bits.len() {
                return Err(Error::InconsistentBitfieldLengths);
            }
            if existing.aggregation_bits.get(committee_index).map(|b| *b).unwrap_or(false) {
                Ok(InsertOutcome::SignatureAlreadyKnown { committee_index })
            } else {
                existing.aggregation_bits.set(committee_index, true);
                Ok(InsertOutcome::SignatureAggregated { committee_index })
            }
        } else {
            if self.map.len() >= MAX_ATTESTATIONS_PER_SLOT {
                return Err(Error::ReachedMaxAttestationsPerSlot(MAX_ATTESTATIONS_PER_SLOT));
            }
            self.map.insert(root, a.clone());
            Ok(InsertOutcome::NewAttestationData { committee_index })
        }
    }

    fn get(&self, data_root: &AttestationDataRoot) -> Option<&Attestation> {
        self.map.get(data_root)
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Append-only (per slot) pool of attestations available for block
/// production; entries older than finality are trimmed by `prune`.
pub struct AggregatingAttestationPool {
    maps: HashMap<Slot, AggregatedAttestationMap>,
    lowest_permissible_slot: Slot,
}

impl Default for AggregatingAttestationPool {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregatingAttestationPool {
    pub fn new() -> Self {
        Self {
            maps: HashMap::new(),
            lowest_permissible_slot: Slot::new(0),
        }
    }

    pub fn insert(&mut self, attestation: &Attestation) -> Result<InsertOutcome, Error> {
        let slot = attestation.data.slot;
        if slot < self.lowest_permissible_slot {
            return Err(Error::SlotTooLow {
                slot,
                lowest_permissible_slot: self.lowest_permissible_slot,
            });
        }

        let outcome = self
            .maps
            .entry(slot)
            .or_insert_with(AggregatedAttestationMap::new)
            .insert(attestation)?;

        lighthouse_metrics::set_gauge(&metrics::AGGREGATING_POOL_SIZE, self.num_attestations() as i64);

        Ok(outcome)
    }

    pub fn get(&self, slot: Slot, data_root: &AttestationDataRoot) -> Option<&Attestation> {
        self.maps.get(&slot).and_then(|map| map.get(data_root))
    }

    fn num_attestations(&self) -> usize {
        self.maps.values().map(AggregatedAttestationMap::len).sum()
    }

    /// Drops every slot at or below `finalized_slot.saturating_sub(SLOTS_RETAINED)`, mirroring
    /// the teacher's finality-driven trimming.
    pub fn prune_below(&mut self, finalized_slot: Slot) {
        let retained = Slot::new(SLOTS_RETAINED as u64);
        let floor = finalized_slot.saturating_sub(retained);
        self.lowest_permissible_slot = floor;
        self.maps.retain(|slot, _| *slot >= floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::{BitVec, Lsb0};
    use types::{AggregateSignature, AttestationData, Checkpoint, Epoch};

    fn attestation(slot: u64, bit: usize) -> Attestation {
        let mut bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 4);
        bits.set(bit, true);
        Attestation {
            aggregation_bits: bits,
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: Hash256::repeat_byte(1),
                source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                target: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            },
            signature: AggregateSignature::empty(),
        }
    }

    #[test]
    fn first_insert_is_new_attestation_data() {
        let mut pool = AggregatingAttestationPool::new();
        let outcome = pool.insert(&attestation(1, 0)).unwrap();
        assert_eq!(outcome, InsertOutcome::NewAttestationData { committee_index: 0 });
    }

    #[test]
    fn second_distinct_bit_aggregates() {
        let mut pool = AggregatingAttestationPool::new();
        pool.insert(&attestation(1, 0)).unwrap();
        let outcome = pool.insert(&attestation(1, 1)).unwrap();
        assert_eq!(outcome, InsertOutcome::SignatureAggregated { committee_index: 1 });

        let root = attestation(1, 0).data.tree_hash_root();
        let stored = pool.get(Slot::new(1), &root).unwrap();
        assert_eq!(stored.num_set_bits(), 2);
    }

    #[test]
    fn repeated_bit_is_already_known() {
        let mut pool = AggregatingAttestationPool::new();
        pool.insert(&attestation(1, 0)).unwrap();
        let outcome = pool.insert(&attestation(1, 0)).unwrap();
        assert_eq!(outcome, InsertOutcome::SignatureAlreadyKnown { committee_index: 0 });
    }

    #[test]
    fn prune_below_drops_old_slots() {
        let mut pool = AggregatingAttestationPool::new();
        pool.insert(&attestation(1, 0)).unwrap();
        pool.insert(&attestation(100, 0)).unwrap();

        pool.prune_below(Slot::new(100));

        let root = attestation(1, 0).data.tree_hash_root();
        assert!(pool.get(Slot::new(1), &root).is_none());
        let root_100 = attestation(100, 0).data.tree_hash_root();
        assert!(pool.get(Slot::new(100), &root_100).is_some());
    }
}
