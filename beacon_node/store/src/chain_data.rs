use crate::chain_state::ChainState;
use crate::errors::Error;
use crate::historical::{InMemoryStore, StorageQuery};
use crate::metrics;
use crate::regen::Regenerator;
use lru::LruCache;
use parking_lot::RwLock;
use slog::{trace, Logger};
use std::collections::BTreeMap;
use std::sync::Arc;
use types::{BeaconBlockHeader, Hash256, Slot};

/// Default number of recently-regenerated states kept in memory. Chosen to
/// comfortably cover a few epochs of re-orgs without unbounded growth;
/// mirrors the teacher's `RecentChainData` block-root cache sizing.
pub const DEFAULT_STATE_CACHE_SIZE: usize = 32;

/// The Combined Chain Data Service (spec Component F): a single read path
/// for "block/state at this root or slot" that transparently falls through
/// from the in-memory recent chain, to the historical store, to on-demand
/// regeneration — so every other component can call one API regardless of
/// how recent the data is.
///
/// `RecentChainData` owns two watermarks the rest of this crate is built
/// around: `head` (the highest known slot, i.e. `bestSlot`, gating
/// regeneration) and `finalized_slot` (the boundary `isFinalized` answers
/// against). Neither is derived from the stored blocks/states themselves —
/// both are pushed in by the caller, since fork choice and finalization are
/// this pipeline's collaborators, not something this crate computes.
pub struct RecentChainData<S> {
    store: Arc<S>,
    regen: Regenerator<S>,
    state_cache: RwLock<LruCache<Hash256, ChainState>>,
    /// slot -> block root for the recent (unpruned) chain. Mirrors the
    /// teacher's `block_roots` cache backing `blockRootBySlot`; nothing is
    /// evicted here, since pruning the recent chain past finalization is
    /// the storage engine's job and is out of scope for this crate.
    slot_roots: RwLock<BTreeMap<Slot, Hash256>>,
    head: RwLock<Option<(Hash256, Slot)>>,
    finalized_slot: RwLock<Slot>,
    slots_per_epoch: u64,
    max_skip_slots: u64,
    log: Logger,
}

impl RecentChainData<InMemoryStore> {
    /// Convenience constructor for tests and small standalone tools: backs
    /// onto an `InMemoryStore` and discards log output.
    pub fn new_in_memory(slots_per_epoch: u64, max_skip_slots: u64) -> Self {
        let store = InMemoryStore::new();
        Self::new(
            store,
            slots_per_epoch,
            max_skip_slots,
            Logger::root(slog::Discard, slog::o!()),
        )
    }
}

impl<S: StorageQuery> RecentChainData<S> {
    pub fn new(store: Arc<S>, slots_per_epoch: u64, max_skip_slots: u64, log: Logger) -> Self {
        Self {
            regen: Regenerator::new(store.clone(), slots_per_epoch),
            store,
            state_cache: RwLock::new(LruCache::new(DEFAULT_STATE_CACHE_SIZE)),
            slot_roots: RwLock::new(BTreeMap::new()),
            head: RwLock::new(None),
            finalized_slot: RwLock::new(Slot::new(0)),
            slots_per_epoch,
            max_skip_slots,
            log,
        }
    }

    pub async fn block(&self, root: &Hash256) -> Result<Option<BeaconBlockHeader>, Error> {
        self.store.block_by_block_root(root).await
    }

    pub async fn put_block(&self, root: Hash256, header: BeaconBlockHeader) -> Result<(), Error> {
        self.store.put_block(root, header).await
    }

    /// Registers a newly-imported block as part of the recent chain,
    /// indexing it by slot and advancing the head (`bestSlot`) watermark if
    /// this block is at or past the current head. `state`, if given, is
    /// stored keyed by `root` the same way `put_state` would.
    pub async fn import_block(
        &self,
        root: Hash256,
        header: BeaconBlockHeader,
        state: Option<ChainState>,
    ) -> Result<(), Error> {
        let slot = header.slot;
        self.put_block(root, header).await?;
        if let Some(state) = state {
            self.put_state(root, state).await?;
        }

        self.slot_roots.write().insert(slot, root);

        let mut head = self.head.write();
        let advances = head.map_or(true, |(_, head_slot)| slot >= head_slot);
        if advances {
            *head = Some((root, slot));
        }
        Ok(())
    }

    /// The highest slot this instance has an opinion about — `bestSlot` in
    /// the State Regenerator's terms. Zero pre-genesis.
    pub fn best_slot(&self) -> Slot {
        self.head.read().map(|(_, slot)| slot).unwrap_or(Slot::new(0))
    }

    /// Advances the finalization watermark. Never moves it backwards: a
    /// finalization notification older than what's already recorded is
    /// simply ignored rather than treated as a fault.
    pub fn finalize(&self, slot: Slot) {
        let mut finalized = self.finalized_slot.write();
        if slot > *finalized {
            *finalized = slot;
        }
    }

    /// `isFinalized(slot)`: true once the finalized epoch's start slot is at
    /// or past `slot`.
    pub fn is_finalized(&self, slot: Slot) -> bool {
        *self.finalized_slot.read() >= slot
    }

    /// Returns the state rooted at `root`, pulling from the cache first,
    /// then the historical store. Does not regenerate — callers that need
    /// a slot past the last known block should use `state_at_slot`.
    pub async fn state_by_root(&self, root: &Hash256) -> Result<Option<ChainState>, Error> {
        if let Some(state) = self.state_cache.write().get(root).cloned() {
            lighthouse_metrics::inc_counter(&metrics::CHAIN_DATA_CACHE_HIT_TOTAL);
            return Ok(Some(state));
        }
        lighthouse_metrics::inc_counter(&metrics::CHAIN_DATA_CACHE_MISS_TOTAL);

        let found = self.store.finalized_state_by_block_root(root).await?;
        if let Some(state) = &found {
            self.state_cache.write().put(*root, state.clone());
        }
        Ok(found)
    }

    /// Returns the state as of `target_slot`, descended from the state
    /// rooted at `base_root`. Regenerates through empty slots when
    /// `target_slot` is past the state's own slot, caching the result
    /// keyed by `base_root` so repeated queries for the same branch don't
    /// re-walk the same empty slots.
    pub async fn state_at_slot(
        &self,
        base_root: Hash256,
        target_slot: Slot,
    ) -> Result<ChainState, Error> {
        if let Some(state) = self.state_cache.write().get(&base_root).cloned() {
            if state.slot == target_slot {
                lighthouse_metrics::inc_counter(&metrics::CHAIN_DATA_CACHE_HIT_TOTAL);
                return Ok(state);
            }
        }
        lighthouse_metrics::inc_counter(&metrics::CHAIN_DATA_CACHE_MISS_TOTAL);

        let timer = lighthouse_metrics::start_timer(&metrics::REGEN_DURATION);
        let state = self
            .regen
            .state_at_slot(base_root, target_slot, self.best_slot(), self.max_skip_slots)
            .await;
        lighthouse_metrics::stop_timer(timer);
        let state = state?;

        self.state_cache.write().put(base_root, state.clone());
        Ok(state)
    }

    pub async fn put_state(&self, root: Hash256, state: ChainState) -> Result<(), Error> {
        self.state_cache.write().put(root, state.clone());
        self.store.put_state(root, state).await
    }

    /// Records the tree-hash root of a state already stored under
    /// `block_root`, so `state_by_state_root` can later resolve it.
    pub async fn register_state_root(
        &self,
        state_root: Hash256,
        slot: Slot,
        block_root: Hash256,
    ) -> Result<(), Error> {
        self.store.register_state_root(state_root, slot, block_root).await
    }

    pub fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
    }

    /// `blockAtSlotExact(slot)`: the block proposed *in* that slot only.
    /// An empty slot (no proposal, or one not yet known locally) returns
    /// `None` with no fault — per §4.F's precondition, any query before
    /// genesis or before the first fork-choice tick behaves the same way.
    pub async fn block_at_slot_exact(
        &self,
        slot: Slot,
    ) -> Result<Option<(Hash256, BeaconBlockHeader)>, Error> {
        let root = match self.slot_roots.read().get(&slot).copied() {
            Some(root) => root,
            None => {
                trace!(self.log, "no block at exact slot"; "slot" => slot.as_u64());
                return Ok(None);
            }
        };
        let header = self.store.block_by_block_root(&root).await?;
        Ok(header.map(|header| (root, header)))
    }

    /// `blockInEffectAtSlot(slot)`: the block proposed in or most recently
    /// before `slot`. Consults the recent chain's slot index first; on a
    /// miss there, falls back to the historical store's "latest finalized
    /// block at slot" query.
    pub async fn block_in_effect_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<(Hash256, BeaconBlockHeader)>, Error> {
        let recent_root = self
            .slot_roots
            .read()
            .range(..=slot)
            .next_back()
            .map(|(_, root)| *root);

        if let Some(root) = recent_root {
            if let Some(header) = self.store.block_by_block_root(&root).await? {
                return Ok(Some((root, header)));
            }
        }

        let found = self.store.latest_finalized_block_at_slot(slot).await?;
        if found.is_none() {
            trace!(self.log, "no block in effect at slot"; "slot" => slot.as_u64());
        }
        Ok(found)
    }

    /// `blockAndStateInEffectAtSlot(slot)`: the in-effect block plus its
    /// block-root-keyed state.
    pub async fn block_and_state_in_effect_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Option<(Hash256, BeaconBlockHeader, ChainState)>, Error> {
        let (root, header) = match self.block_in_effect_at_slot(slot).await? {
            Some(found) => found,
            None => return Ok(None),
        };
        let state = match self.state_by_root(&root).await? {
            Some(state) => state,
            None => return Ok(None),
        };
        Ok(Some((root, header, state)))
    }

    /// `stateAtSlotExact(slot)`: the state whose own slot equals `slot`
    /// exactly, obtained by fetching the in-effect block's state and
    /// regenerating forward. Failures (unknown root, exceeding the skip
    /// budget, a slot past `bestSlot`) surface as `None`, matching §4.E's
    /// "failures surface as an empty result, not as an exception".
    pub async fn state_at_slot_exact(&self, slot: Slot) -> Result<Option<ChainState>, Error> {
        let (root, _) = match self.block_in_effect_at_slot(slot).await? {
            Some(found) => found,
            None => return Ok(None),
        };

        match self.state_at_slot(root, slot).await {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                trace!(self.log, "state regeneration failed, returning empty"; "slot" => slot.as_u64(), "error" => ?e);
                Ok(None)
            }
        }
    }

    /// `latestStateAtSlot(slot)`: if `slot` is at or after finalization,
    /// tries the recent-chain path first; otherwise, or on a miss there,
    /// falls back to the historical finalized-state query. The fallback
    /// also covers the race between "recent miss" and a concurrent
    /// finalization advance past `slot`.
    pub async fn latest_state_at_slot(&self, slot: Slot) -> Result<Option<ChainState>, Error> {
        if slot >= *self.finalized_slot.read() {
            if let Some(state) = self.state_at_slot_exact(slot).await? {
                return Ok(Some(state));
            }
        }

        self.store.latest_finalized_state_at_slot(slot).await
    }

    /// `stateByStateRoot(root)`: resolves a state's own tree-hash root via
    /// the historical index. If the full (slot, block root) mapping is
    /// known, regenerates from that block's state; otherwise falls back to
    /// the slot-only index and `state_at_slot_exact`.
    pub async fn state_by_state_root(&self, state_root: &Hash256) -> Result<Option<ChainState>, Error> {
        if let Some((slot, block_root)) = self
            .store
            .slot_and_block_root_by_state_root(state_root)
            .await?
        {
            return Ok(Some(self.state_at_slot(block_root, slot).await?));
        }

        if let Some(slot) = self.store.finalized_slot_by_state_root(state_root).await? {
            return self.state_at_slot_exact(slot).await;
        }

        Ok(None)
    }

    /// `ancestorRoots(startSlot, step, count)`: an ordered walk back over
    /// the recent chain starting at `startSlot`, striding `step` slots at a
    /// time, yielding at most `count` roots. Stops early (returning what it
    /// has so far) once it runs off the known chain; non-empty whenever at
    /// least one ancestor at or before `startSlot` is known.
    pub async fn ancestor_roots(
        &self,
        start_slot: Slot,
        step: u64,
        count: usize,
    ) -> Result<Vec<Hash256>, Error> {
        let mut roots = Vec::with_capacity(count.min(64));
        let mut slot = start_slot;

        for i in 0..count {
            match self.block_in_effect_at_slot(slot).await? {
                Some((root, _)) => roots.push(root),
                None => break,
            }
            if i + 1 == count || slot.as_u64() == 0 {
                break;
            }
            slot = Slot::new(slot.as_u64().saturating_sub(step));
        }

        if roots.is_empty() {
            trace!(self.log, "ancestor_roots found no known ancestor"; "start_slot" => start_slot.as_u64());
        }
        Ok(roots)
    }
}
