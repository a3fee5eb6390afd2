use crate::chain_state::{advance_one_slot, ChainState};
use crate::errors::Error;
use crate::historical::StorageQuery;
use crate::metrics;
use std::sync::Arc;
use types::{Hash256, Slot};

/// Walks a known state forward to a requested slot by repeated empty-slot
/// processing, one slot at a time, stopping either at the target or at
/// `max_skip_slots` — whichever comes first. Mirrors
/// `BeaconChain::regenerate` in the teacher: a loop over
/// `per_slot_processing` guarded by `ChainConfig::import_max_skip_slots` so
/// that a query for a slot thousands of empty slots ahead of the last known
/// block can't be used to force unbounded work.
pub struct Regenerator<S> {
    store: Arc<S>,
    slots_per_epoch: u64,
}

impl<S: StorageQuery> Regenerator<S> {
    pub fn new(store: Arc<S>, slots_per_epoch: u64) -> Self {
        Self {
            store,
            slots_per_epoch,
        }
    }

    /// Regenerates the state at `target_slot`, starting from `base_state`
    /// (the state rooted at the most recent block at or before
    /// `target_slot`). `best_slot` is the highest slot fork choice
    /// currently has an opinion about; a target past it is refused rather
    /// than silently treated as an empty-slot replay of the unknown future.
    /// Returns the advanced state without persisting it; callers decide
    /// whether the result is worth caching.
    pub async fn regenerate(
        &self,
        base_state: ChainState,
        target_slot: Slot,
        best_slot: Slot,
        max_skip_slots: u64,
    ) -> Result<ChainState, Error> {
        if base_state.slot == target_slot {
            return Ok(base_state);
        }

        if target_slot > best_slot {
            return Err(Error::FutureSlot {
                requested: target_slot,
                best_slot,
            });
        }

        if base_state.slot > target_slot {
            return Err(Error::SlotOutOfBounds {
                requested: target_slot,
                earliest: base_state.slot,
            });
        }

        let skipped = target_slot.as_u64().saturating_sub(base_state.slot.as_u64());
        if skipped > max_skip_slots {
            return Err(Error::SlotProcessing {
                reached: base_state.slot,
                target: target_slot,
                max_skip_slots,
            });
        }

        let mut state = base_state;
        while state.slot < target_slot {
            state = advance_one_slot(state, self.slots_per_epoch);
            metrics::inc_counter(&metrics::REGEN_SLOTS_ADVANCED_TOTAL);
        }

        Ok(state)
    }

    /// Loads the state rooted at `base_root` and, if it isn't already at
    /// `target_slot`, regenerates it forward. Used by `RecentChainData` on
    /// a cache miss.
    pub async fn state_at_slot(
        &self,
        base_root: Hash256,
        target_slot: Slot,
        best_slot: Slot,
        max_skip_slots: u64,
    ) -> Result<ChainState, Error> {
        let base = self
            .store
            .finalized_state_by_block_root(&base_root)
            .await?
            .ok_or(Error::UnknownState(base_root))?;

        if base.slot == target_slot {
            return Ok(base);
        }

        self.regenerate(base, target_slot, best_slot, max_skip_slots)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::historical::InMemoryStore;
    use types::Hash256;

    fn genesis_state() -> ChainState {
        ChainState::genesis(Hash256::repeat_byte(1), 4)
    }

    #[tokio::test]
    async fn regenerate_advances_to_target_slot() {
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);

        let advanced = regen
            .regenerate(genesis_state(), Slot::new(5), Slot::new(1000), 1000)
            .await
            .unwrap();

        assert_eq!(advanced.slot, Slot::new(5));
    }

    #[tokio::test]
    async fn regenerate_returns_base_state_unchanged_when_already_at_target() {
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);
        let base = genesis_state();

        let same = regen
            .regenerate(base.clone(), Slot::new(0), Slot::new(0), 1000)
            .await
            .unwrap();

        assert_eq!(same, base);
    }

    #[tokio::test]
    async fn regenerate_refuses_beyond_max_skip_slots() {
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);

        let err = regen
            .regenerate(genesis_state(), Slot::new(10), Slot::new(1000), 5)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::SlotProcessing {
                reached: Slot::new(0),
                target: Slot::new(10),
                max_skip_slots: 5,
            }
        );
    }

    #[tokio::test]
    async fn regenerate_rejects_target_behind_base() {
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);
        let mut base = genesis_state();
        base.slot = Slot::new(10);

        let err = regen
            .regenerate(base, Slot::new(3), Slot::new(1000), 1000)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::SlotOutOfBounds {
                requested: Slot::new(3),
                earliest: Slot::new(10),
            }
        );
    }

    #[tokio::test]
    async fn regenerate_rejects_target_beyond_best_slot() {
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);

        let err = regen
            .regenerate(genesis_state(), Slot::new(20), Slot::new(10), 1000)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::FutureSlot {
                requested: Slot::new(20),
                best_slot: Slot::new(10),
            }
        );
    }

    #[tokio::test]
    async fn regenerate_prefers_future_slot_over_skip_limit() {
        // A target both beyond best_slot and beyond max_skip_slots must be
        // reported as FutureSlot: the caller needs to know the slot itself
        // is unreachable, not merely that this call's skip budget is too low.
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);

        let err = regen
            .regenerate(genesis_state(), Slot::new(20), Slot::new(10), 2)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::FutureSlot {
                requested: Slot::new(20),
                best_slot: Slot::new(10),
            }
        );
    }

    #[tokio::test]
    async fn state_at_slot_regenerates_on_miss() {
        let store = InMemoryStore::new();
        let root = Hash256::repeat_byte(9);
        store.put_state(root, genesis_state()).await.unwrap();

        let regen = Regenerator::new(store, 32);
        let state = regen
            .state_at_slot(root, Slot::new(2), Slot::new(1000), 1000)
            .await
            .unwrap();

        assert_eq!(state.slot, Slot::new(2));
    }

    #[tokio::test]
    async fn state_at_slot_errors_on_unknown_root() {
        let store = InMemoryStore::new();
        let regen = Regenerator::new(store, 32);

        let err = regen
            .state_at_slot(Hash256::repeat_byte(4), Slot::new(1), Slot::new(1000), 1000)
            .await
            .unwrap_err();

        assert_eq!(err, Error::UnknownState(Hash256::repeat_byte(4)));
    }
}
