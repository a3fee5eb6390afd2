//! Component A: the three bounded in-memory parks an attestation sits in
//! while it waits on a trigger condition it cannot yet satisfy. All three
//! are owned exclusively by the Attestation Manager (`attestation_manager`)
//! and are single-writer by construction — no internal locking, callers
//! serialize access themselves.

use crate::metrics;
use slog::{debug, Logger};
use std::collections::{HashMap, HashSet, VecDeque};
use types::{Hash256, IndexedAttestation, Slot, ValidatorIndex};

/// **Pending** (`depends-on-block`): parks attestations whose
/// `beacon_block_root` fork choice doesn't recognize yet. Drained whole,
/// by root, when the corresponding block import notification arrives.
pub struct PendingPool {
    items: HashMap<Hash256, HashSet<IndexedAttestation>>,
    insertion_order: VecDeque<Hash256>,
    capacity: usize,
    log: Logger,
}

impl PendingPool {
    pub fn new(capacity: usize, log: Logger) -> Self {
        Self {
            items: HashMap::new(),
            insertion_order: VecDeque::new(),
            capacity,
            log,
        }
    }

    pub fn contains_block(&self, root: &Hash256) -> bool {
        self.items.contains_key(root)
    }

    /// `true` if this exact attestation is already parked under `root`,
    /// letting the manager short-circuit duplicate submissions in O(1).
    pub fn contains(&self, root: &Hash256, attestation: &IndexedAttestation) -> bool {
        self.items
            .get(root)
            .map(|set| set.contains(attestation))
            .unwrap_or(false)
    }

    pub fn insert(&mut self, root: Hash256, attestation: IndexedAttestation) {
        let is_new_key = !self.items.contains_key(&root);
        self.items.entry(root).or_insert_with(HashSet::new).insert(attestation);

        if is_new_key {
            self.insertion_order.push_back(root);
            self.evict_if_over_capacity();
        }
        lighthouse_metrics::set_gauge(&metrics::PENDING_POOL_SIZE, self.items.len() as i64);
    }

    /// Removes and returns every attestation parked under `root`, for
    /// resubmission once the block has been imported.
    pub fn remove_for_block(&mut self, root: &Hash256) -> Vec<IndexedAttestation> {
        let removed = self
            .items
            .remove(root)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        self.insertion_order.retain(|r| r != root);
        lighthouse_metrics::set_gauge(&metrics::PENDING_POOL_SIZE, self.items.len() as i64);
        removed
    }

    fn evict_if_over_capacity(&mut self) {
        while self.items.len() > self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.items.remove(&oldest);
                debug!(self.log, "Pending pool over capacity, evicted oldest entry"; "block_root" => ?oldest);
            } else {
                break;
            }
        }
    }
}

/// **Future** (`depends-on-slot`): parks attestations whose slot is ahead
/// of the local clock. Tracks a watermark so `contains` can reject items
/// that are already stale relative to the most recent `prune`.
pub struct FutureItems {
    items: HashMap<Slot, Vec<IndexedAttestation>>,
    watermark: Slot,
    capacity: usize,
    log: Logger,
}

impl FutureItems {
    pub fn new(capacity: usize, log: Logger) -> Self {
        Self {
            items: HashMap::new(),
            watermark: Slot::new(0),
            capacity,
            log,
        }
    }

    pub fn watermark(&self) -> Slot {
        self.watermark
    }

    pub fn insert(&mut self, slot: Slot, attestation: IndexedAttestation) {
        debug_assert!(slot > self.watermark);
        self.items.entry(slot).or_insert_with(Vec::new).push(attestation);
        self.evict_if_over_capacity();
        lighthouse_metrics::set_gauge(&metrics::FUTURE_ITEMS_SIZE, self.items.len() as i64);
    }

    /// Advances the watermark to `current_slot` and returns every item with
    /// `slot <= current_slot`, removing them.
    pub fn prune(&mut self, current_slot: Slot) -> Vec<IndexedAttestation> {
        self.watermark = current_slot;
        let ready_slots: Vec<Slot> = self
            .items
            .keys()
            .filter(|slot| **slot <= current_slot)
            .copied()
            .collect();

        let mut drained = Vec::new();
        for slot in ready_slots {
            if let Some(mut items) = self.items.remove(&slot) {
                drained.append(&mut items);
            }
        }
        lighthouse_metrics::set_gauge(&metrics::FUTURE_ITEMS_SIZE, self.items.len() as i64);
        drained
    }

    fn evict_if_over_capacity(&mut self) {
        while self.items.len() > self.capacity {
            if let Some(latest_slot) = self.items.keys().copied().max() {
                self.items.remove(&latest_slot);
                debug!(self.log, "Future items pool over capacity, evicted furthest slot"; "slot" => ?latest_slot);
            } else {
                break;
            }
        }
    }
}

/// Per-validator-index vote, collapsed so a deferred bucket holds at most
/// one entry per validator — mirrors `DeferredVotes` in the data model.
#[derive(Debug, Default, Clone)]
pub struct DeferredVotes {
    pub votes: HashMap<ValidatorIndex, IndexedAttestation>,
}

impl DeferredVotes {
    pub(crate) fn insert(&mut self, attestation: IndexedAttestation) {
        for index in &attestation.attesting_indices {
            self.votes.insert(*index, attestation.clone());
        }
    }

    pub fn into_attestations(self) -> Vec<IndexedAttestation> {
        let mut seen = HashSet::new();
        self.votes
            .into_values()
            .filter(|a| seen.insert(a.data.tree_hash_root()))
            .collect()
    }
}

/// **Deferred** (`wait-one-tick`): holds indexed attestations fork choice
/// asked to re-evaluate on the following slot tick.
pub struct DeferredAttestations {
    buckets: HashMap<Slot, DeferredVotes>,
    capacity: usize,
    log: Logger,
}

impl DeferredAttestations {
    pub fn new(capacity: usize, log: Logger) -> Self {
        Self {
            buckets: HashMap::new(),
            capacity,
            log,
        }
    }

    pub fn insert(&mut self, slot: Slot, attestation: IndexedAttestation) {
        self.buckets.entry(slot).or_insert_with(Default::default).insert(attestation);
        self.evict_if_over_capacity();
        lighthouse_metrics::set_gauge(&metrics::DEFERRED_ATTESTATIONS_SIZE, self.buckets.len() as i64);
    }

    /// Returns and removes every bucket with `slot <= current_slot`.
    pub fn prune(&mut self, current_slot: Slot) -> Vec<DeferredVotes> {
        let ready_slots: Vec<Slot> = self
            .buckets
            .keys()
            .filter(|slot| **slot <= current_slot)
            .copied()
            .collect();

        let drained = ready_slots
            .into_iter()
            .filter_map(|slot| self.buckets.remove(&slot))
            .collect();
        lighthouse_metrics::set_gauge(&metrics::DEFERRED_ATTESTATIONS_SIZE, self.buckets.len() as i64);
        drained
    }

    fn evict_if_over_capacity(&mut self) {
        while self.buckets.len() > self.capacity {
            if let Some(oldest_slot) = self.buckets.keys().copied().min() {
                self.buckets.remove(&oldest_slot);
                debug!(self.log, "Deferred attestations pool over capacity, evicted oldest bucket"; "slot" => ?oldest_slot);
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{AttestationData, Checkpoint, Epoch};

    fn test_logger() -> Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn indexed(indices: &[u64], slot: u64) -> IndexedAttestation {
        IndexedAttestation {
            attesting_indices: indices.to_vec(),
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: Hash256::repeat_byte(1),
                source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                target: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            },
            signature: types::AggregateSignature::empty(),
        }
    }

    #[test]
    fn pending_pool_round_trips_by_block_root() {
        let mut pool = PendingPool::new(10, test_logger());
        let root = Hash256::repeat_byte(9);
        pool.insert(root, indexed(&[1], 5));

        assert!(pool.contains_block(&root));
        let drained = pool.remove_for_block(&root);
        assert_eq!(drained.len(), 1);
        assert!(!pool.contains_block(&root));
    }

    #[test]
    fn pending_pool_evicts_oldest_over_capacity() {
        let mut pool = PendingPool::new(1, test_logger());
        pool.insert(Hash256::repeat_byte(1), indexed(&[1], 1));
        pool.insert(Hash256::repeat_byte(2), indexed(&[2], 2));

        assert!(!pool.contains_block(&Hash256::repeat_byte(1)));
        assert!(pool.contains_block(&Hash256::repeat_byte(2)));
    }

    #[test]
    fn future_items_prune_returns_items_at_or_before_slot() {
        let mut future = FutureItems::new(10, test_logger());
        future.insert(Slot::new(5), indexed(&[1], 5));
        future.insert(Slot::new(10), indexed(&[2], 10));

        let drained = future.prune(Slot::new(5));
        assert_eq!(drained.len(), 1);
        assert_eq!(future.watermark(), Slot::new(5));

        let drained_later = future.prune(Slot::new(10));
        assert_eq!(drained_later.len(), 1);
    }

    #[test]
    fn deferred_attestations_collapse_by_validator_index() {
        let mut deferred = DeferredAttestations::new(10, test_logger());
        deferred.insert(Slot::new(3), indexed(&[1, 2], 2));
        deferred.insert(Slot::new(3), indexed(&[1], 2));

        let buckets = deferred.prune(Slot::new(3));
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].votes.len(), 2);
    }
}
