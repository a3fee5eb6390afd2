use eth2_hashing::hash;
use serde_derive::{Deserialize, Serialize};

use crate::{Hash256, Slot, ValidatorIndex};

/// A block header, as referenced by attestations' `beacon_block_root` and by
/// the chain data service's canonical-head bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body_root: Hash256,
}

impl BeaconBlockHeader {
    /// A stand-in for SSZ tree-hashing: concatenates the header's fields and
    /// hashes them. Not merkleized, so it is not interoperable with a real
    /// SSZ-hashing client, but it is a stable, collision-resistant identity
    /// for everything this pipeline needs a "block root" for.
    pub fn canonical_root(&self) -> Hash256 {
        let mut bytes = Vec::with_capacity(8 + 8 + 32 + 32 + 32);
        bytes.extend_from_slice(&self.slot.as_u64().to_le_bytes());
        bytes.extend_from_slice(&self.proposer_index.to_le_bytes());
        bytes.extend_from_slice(self.parent_root.as_bytes());
        bytes.extend_from_slice(self.state_root.as_bytes());
        bytes.extend_from_slice(self.body_root.as_bytes());
        Hash256::from_slice(&hash(&bytes))
    }
}
