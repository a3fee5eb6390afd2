use crate::chain_state::ChainState;
use crate::errors::Error;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use types::{BeaconBlockHeader, Hash256, Slot};

/// Historical lookups are exposed behind a trait rather than a concrete
/// on-disk engine: no LevelDB/sled backend is in scope for this pipeline,
/// only the access pattern the Combined Chain Data Service needs. Lookups
/// are `async` so that a real backend (a disk-backed KV store, reached over
/// a thread pool or an actual async driver) can be dropped in without
/// touching any caller.
///
/// The finalized-block/state pruning a real freezer DB performs is out of
/// scope here (§1 excludes "the raw block storage engine and its
/// finalization database"); implementations are free to retain everything
/// they're given. `RecentChainData` is what decides, via its own
/// finalization watermark, which answers it trusts as "finalized".
#[async_trait]
pub trait StorageQuery: Send + Sync {
    /// Looks up a block by its own root, regardless of finalization.
    async fn block_by_block_root(&self, root: &Hash256) -> Result<Option<BeaconBlockHeader>, Error>;
    /// The block (and its root) proposed in or most recently before `slot`,
    /// as known to the historical store — the fallback `blockInEffectAtSlot`
    /// reaches for once the in-memory recent-chain index misses.
    async fn latest_finalized_block_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<(Hash256, BeaconBlockHeader)>, Error>;
    /// The state rooted at `root` (a block root), regardless of finalization.
    async fn finalized_state_by_block_root(
        &self,
        root: &Hash256,
    ) -> Result<Option<ChainState>, Error>;
    /// The state in effect at or most recently before `slot`.
    async fn latest_finalized_state_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<ChainState>, Error>;
    /// Resolves a state's own tree-hash root to the slot and block root it
    /// was produced at. Populated by whoever computes that root — hashing a
    /// `ChainState` is outside this crate's scope — via `register_state_root`.
    async fn slot_and_block_root_by_state_root(
        &self,
        state_root: &Hash256,
    ) -> Result<Option<(Slot, Hash256)>, Error>;
    /// A slot-only fallback for `slot_and_block_root_by_state_root`, for
    /// stores that have dropped a state root's block-root association but
    /// kept its slot (e.g. after the owning block was itself pruned).
    async fn finalized_slot_by_state_root(&self, state_root: &Hash256) -> Result<Option<Slot>, Error>;

    async fn put_block(&self, root: Hash256, header: BeaconBlockHeader) -> Result<(), Error>;
    async fn put_state(&self, block_root: Hash256, state: ChainState) -> Result<(), Error>;
    /// Records the state-root index entry for a state already stored under
    /// `block_root`; see `slot_and_block_root_by_state_root`.
    async fn register_state_root(
        &self,
        state_root: Hash256,
        slot: Slot,
        block_root: Hash256,
    ) -> Result<(), Error>;
}

/// Resolves every lookup immediately from an in-process map. Stands in for
/// whatever persistent store a deployment would otherwise wire up; used by
/// both the unit tests in this crate and as the default backend for
/// `RecentChainData` when no other `StorageQuery` is supplied.
#[derive(Default)]
pub struct InMemoryStore {
    blocks: RwLock<HashMap<Hash256, BeaconBlockHeader>>,
    blocks_by_slot: RwLock<BTreeMap<Slot, Hash256>>,
    states: RwLock<HashMap<Hash256, ChainState>>,
    state_roots: RwLock<HashMap<Hash256, (Slot, Hash256)>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl StorageQuery for InMemoryStore {
    async fn block_by_block_root(&self, root: &Hash256) -> Result<Option<BeaconBlockHeader>, Error> {
        Ok(self.blocks.read().get(root).cloned())
    }

    async fn latest_finalized_block_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<(Hash256, BeaconBlockHeader)>, Error> {
        let root = self
            .blocks_by_slot
            .read()
            .range(..=slot)
            .next_back()
            .map(|(_, root)| *root);
        match root {
            Some(root) => Ok(self.block_by_block_root(&root).await?.map(|header| (root, header))),
            None => Ok(None),
        }
    }

    async fn finalized_state_by_block_root(
        &self,
        root: &Hash256,
    ) -> Result<Option<ChainState>, Error> {
        Ok(self.states.read().get(root).cloned())
    }

    async fn latest_finalized_state_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<ChainState>, Error> {
        let root = self
            .blocks_by_slot
            .read()
            .range(..=slot)
            .next_back()
            .map(|(_, root)| *root);
        match root {
            Some(root) => self.finalized_state_by_block_root(&root).await,
            None => Ok(None),
        }
    }

    async fn slot_and_block_root_by_state_root(
        &self,
        state_root: &Hash256,
    ) -> Result<Option<(Slot, Hash256)>, Error> {
        Ok(self.state_roots.read().get(state_root).copied())
    }

    async fn finalized_slot_by_state_root(&self, state_root: &Hash256) -> Result<Option<Slot>, Error> {
        Ok(self
            .state_roots
            .read()
            .get(state_root)
            .map(|(slot, _)| *slot))
    }

    async fn put_block(&self, root: Hash256, header: BeaconBlockHeader) -> Result<(), Error> {
        self.blocks_by_slot.write().insert(header.slot, root);
        self.blocks.write().insert(root, header);
        Ok(())
    }

    async fn put_state(&self, block_root: Hash256, state: ChainState) -> Result<(), Error> {
        self.states.write().insert(block_root, state);
        Ok(())
    }

    async fn register_state_root(
        &self,
        state_root: Hash256,
        slot: Slot,
        block_root: Hash256,
    ) -> Result<(), Error> {
        self.state_roots.write().insert(state_root, (slot, block_root));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Checkpoint, Epoch};

    fn header(slot: u64) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: Slot::new(slot),
            proposer_index: 0,
            parent_root: Hash256::zero(),
            state_root: Hash256::zero(),
            body_root: Hash256::zero(),
        }
    }

    fn state(slot: u64) -> ChainState {
        ChainState {
            slot: Slot::new(slot),
            latest_block_header: header(slot),
            current_justified_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            finalized_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            balances: vec![32_000_000_000],
            randao_mix: Hash256::zero(),
        }
    }

    #[tokio::test]
    async fn put_then_get_block_round_trips() {
        let store = InMemoryStore::new();
        let root = Hash256::repeat_byte(1);
        store.put_block(root, header(3)).await.unwrap();

        let found = store.block_by_block_root(&root).await.unwrap();
        assert_eq!(found.map(|h| h.slot), Some(Slot::new(3)));
    }

    #[tokio::test]
    async fn unknown_block_returns_none_not_error() {
        let store = InMemoryStore::new();
        let found = store.block_by_block_root(&Hash256::repeat_byte(9)).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn put_then_get_state_round_trips() {
        let store = InMemoryStore::new();
        let root = Hash256::repeat_byte(2);
        let state = state(5);
        store.put_state(root, state.clone()).await.unwrap();

        let found = store.finalized_state_by_block_root(&root).await.unwrap();
        assert_eq!(found, Some(state));
    }

    #[tokio::test]
    async fn latest_finalized_block_at_slot_finds_most_recent_before() {
        let store = InMemoryStore::new();
        let root_ten = Hash256::repeat_byte(1);
        store.put_block(root_ten, header(10)).await.unwrap();

        let found = store.latest_finalized_block_at_slot(Slot::new(15)).await.unwrap();
        assert_eq!(found, Some((root_ten, header(10))));

        let before_any = store.latest_finalized_block_at_slot(Slot::new(5)).await.unwrap();
        assert!(before_any.is_none());
    }

    #[tokio::test]
    async fn state_root_index_resolves_slot_and_block_root() {
        let store = InMemoryStore::new();
        let block_root = Hash256::repeat_byte(3);
        let state_root = Hash256::repeat_byte(4);
        store
            .register_state_root(state_root, Slot::new(7), block_root)
            .await
            .unwrap();

        let resolved = store
            .slot_and_block_root_by_state_root(&state_root)
            .await
            .unwrap();
        assert_eq!(resolved, Some((Slot::new(7), block_root)));

        let slot_only = store.finalized_slot_by_state_root(&state_root).await.unwrap();
        assert_eq!(slot_only, Some(Slot::new(7)));
    }

    #[tokio::test]
    async fn unknown_state_root_resolves_to_none() {
        let store = InMemoryStore::new();
        let resolved = store
            .slot_and_block_root_by_state_root(&Hash256::repeat_byte(9))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }
}
