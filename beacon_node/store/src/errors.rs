use types::{Hash256, Slot};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// Requested a block/state root that has never been stored.
    UnknownBlock(Hash256),
    UnknownState(Hash256),
    /// `regenerate` hit `ChainConfig::import_max_skip_slots` before reaching the target slot.
    SlotProcessing {
        reached: Slot,
        target: Slot,
        max_skip_slots: u64,
    },
    /// The requested slot is earlier than the oldest state this store retains.
    SlotOutOfBounds { requested: Slot, earliest: Slot },
    /// `target_slot` is ahead of `best_slot`, the highest slot fork choice has an
    /// opinion about. Regeneration only ever replays *known* history forward;
    /// it cannot manufacture a state for a slot nothing has voted on yet.
    FutureSlot { requested: Slot, best_slot: Slot },
    /// Attempted to query with a finalized-descendant assumption that does not hold.
    NotDescendantOfFinalized { root: Hash256 },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
