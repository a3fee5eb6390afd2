use types::{BeaconBlockHeader, Checkpoint, Epoch, Hash256, Slot};

/// A minimal stand-in for a full SSZ `BeaconState`: exactly the fields the
/// Combined Chain Data Service and fork choice need to keep operating across
/// empty slots. State transition's validator registry, RANDAO mixes, and
/// reward accounting are all out of scope (state transition is a
/// collaborator this pipeline calls into, not something it re-implements).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    pub slot: Slot,
    pub latest_block_header: BeaconBlockHeader,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    /// Effective balances of the full validator registry, indexed by
    /// validator index. Read by the Fork-Choice Gateway to weight votes.
    pub balances: Vec<u64>,
    /// Rotated once per epoch by `advance_epoch`; stands in for the RANDAO
    /// mix the real state transition would update.
    pub randao_mix: Hash256,
}

impl ChainState {
    pub fn genesis(genesis_root: Hash256, validator_count: usize) -> Self {
        Self {
            slot: Slot::new(0),
            latest_block_header: BeaconBlockHeader {
                slot: Slot::new(0),
                proposer_index: 0,
                parent_root: Hash256::zero(),
                state_root: Hash256::zero(),
                body_root: genesis_root,
            },
            current_justified_checkpoint: Checkpoint::new(Epoch::new(0), genesis_root),
            finalized_checkpoint: Checkpoint::new(Epoch::new(0), genesis_root),
            balances: vec![32_000_000_000; validator_count],
            randao_mix: genesis_root,
        }
    }

    pub fn current_epoch(&self, slots_per_epoch: u64) -> Epoch {
        self.slot.epoch(slots_per_epoch)
    }
}

/// Advances `state` by exactly one slot, with no new block — the "empty
/// slot" path the State Regenerator takes while walking forward from the
/// last known state to a requested slot. At an epoch boundary, runs a
/// simplified `process_epoch` that rotates the RANDAO-mix placeholder; it
/// deliberately does not touch justification/finalization, since those only
/// change in response to attestation-driven epoch processing carried out by
/// state transition itself, which lies outside this pipeline's scope.
///
/// Mirrors the call shape of `state_processing::per_slot_processing`.
pub fn advance_one_slot(mut state: ChainState, slots_per_epoch: u64) -> ChainState {
    let next_slot = state.slot + Slot::new(1);
    let was_epoch_boundary = next_slot.as_u64() % slots_per_epoch == 0;

    state.slot = next_slot;

    if was_epoch_boundary {
        state.randao_mix = rotate_randao(state.randao_mix);
    }

    state
}

fn rotate_randao(mix: Hash256) -> Hash256 {
    use eth2_hashing::hash;
    Hash256::from_slice(&hash(mix.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_one_slot_increments_slot() {
        let state = ChainState::genesis(Hash256::repeat_byte(7), 4);
        let next = advance_one_slot(state.clone(), 32);
        assert_eq!(next.slot, Slot::new(1));
        assert_eq!(next.randao_mix, state.randao_mix);
    }

    #[test]
    fn advance_one_slot_rotates_randao_at_epoch_boundary() {
        let mut state = ChainState::genesis(Hash256::repeat_byte(7), 4);
        state.slot = Slot::new(31);
        let next = advance_one_slot(state.clone(), 32);
        assert_eq!(next.slot, Slot::new(32));
        assert_ne!(next.randao_mix, state.randao_mix);
    }
}
