//! A simplified LMD-GHOST fork-choice backend: a flat array of block nodes
//! plus per-validator vote tracking, scored by validator balance deltas.
//!
//! The internal scoring algorithm (`proto_array::apply_score_changes`) is not
//! the focus of this pipeline — it exists so the Fork-Choice Gateway
//! (`beacon_chain::fork_choice_gateway`) has something real to drive. What
//! matters to the rest of the system is the public surface:
//! `process_block`, `process_attestation`, `find_head`, `maybe_prune`.

mod error;
mod proto_array;

pub use crate::proto_array::ProtoNode;
pub use error::Error;

use parking_lot::RwLock;
use serde_derive::{Deserialize, Serialize};
use types::{Epoch, Hash256, Slot};

use crate::proto_array::ProtoArray;

/// Default: do not prune a tree with fewer than this many nodes.
pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

/// A single validator's most recent vote, used to compute balance-weighted
/// score deltas incrementally rather than re-scanning all attestations ever
/// seen.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct VoteTracker {
    pub current_root: Hash256,
    pub next_root: Hash256,
    pub next_epoch: Epoch,
}

impl Default for VoteTracker {
    fn default() -> Self {
        Self {
            current_root: Hash256::zero(),
            next_root: Hash256::zero(),
            next_epoch: Epoch::new(0),
        }
    }
}

/// A `Vec` that grows to accommodate any index written to it, yielding
/// `T::default()` for indices that have never been written. Used to index
/// votes/balances by validator index without pre-allocating for the full
/// validator registry.
#[derive(PartialEq, Debug, Serialize, Deserialize)]
pub struct ElasticList<T>(pub Vec<T>);

impl<T> Default for ElasticList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Default + Clone> ElasticList<T> {
    fn grow(&mut self, index: usize) {
        if self.0.len() <= index {
            self.0.resize(index + 1, T::default());
        }
    }

    pub fn get_mut(&mut self, index: usize) -> &mut T {
        self.grow(index);
        &mut self.0[index]
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)
    }
}

/// A block as seen by fork choice: the slice of block/state data LMD-GHOST
/// and attestation validation actually need, independent of full SSZ block
/// bodies. Mirrors the teacher's `proto_array::Block`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    pub slot: Slot,
    pub root: Hash256,
    pub parent_root: Option<Hash256>,
    pub state_root: Hash256,
    pub target_root: Hash256,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
}

/// Thread-safe handle onto a `ProtoArray`, its vote tracker and validator
/// balances. Wrapped by `fork_choice::ForkChoice` and, in turn, by the
/// Fork-Choice Gateway actor.
pub struct ProtoArrayForkChoice {
    proto_array: RwLock<ProtoArray>,
    votes: RwLock<ElasticList<VoteTracker>>,
    balances: RwLock<Vec<u64>>,
}

impl ProtoArrayForkChoice {
    pub fn new(
        finalized_block_slot: Slot,
        finalized_block_state_root: Hash256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        finalized_root: Hash256,
    ) -> Result<Self, String> {
        let mut proto_array = ProtoArray {
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            justified_epoch,
            finalized_epoch,
            nodes: Vec::with_capacity(1),
            indices: std::collections::HashMap::with_capacity(1),
        };

        proto_array
            .on_new_block(
                finalized_block_slot,
                finalized_root,
                None,
                finalized_block_state_root,
                finalized_root,
                justified_epoch,
                finalized_epoch,
            )
            .map_err(|e| format!("failed to add finalized block to proto_array: {:?}", e))?;

        Ok(Self {
            proto_array: RwLock::new(proto_array),
            votes: RwLock::new(ElasticList::default()),
            balances: RwLock::new(Vec::new()),
        })
    }

    /// Registers a new block (component C: "registers blocks"). Idempotent:
    /// re-submitting an already-known root is a no-op, matching the
    /// Fork-Choice Gateway's re-submission guarantee.
    pub fn process_block(&self, block: Block) -> Result<(), String> {
        if self.proto_array.read().contains_block(&block.root) {
            return Ok(());
        }

        self.proto_array
            .write()
            .on_new_block(
                block.slot,
                block.root,
                block.parent_root,
                block.state_root,
                block.target_root,
                block.justified_epoch,
                block.finalized_epoch,
            )
            .map_err(|e| format!("process_block_error: {:?}", e))
    }

    pub fn get_block(&self, block_root: &Hash256) -> Option<Block> {
        let proto_array = self.proto_array.read();
        let node = proto_array.get_node(block_root)?;
        Some(Block {
            slot: node.slot,
            root: node.root,
            parent_root: proto_array.get_node_parent_root(node),
            state_root: node.state_root,
            target_root: node.target_root,
            justified_epoch: node.justified_epoch,
            finalized_epoch: node.finalized_epoch,
        })
    }

    /// Returns the latest known `(block_root, target_epoch)` vote for
    /// `validator_index`, if any.
    pub fn latest_message(&self, validator_index: usize) -> Option<(Hash256, Epoch)> {
        let votes = self.votes.read();
        let vote = votes.get(validator_index)?;
        if vote.current_root == Hash256::zero() {
            None
        } else {
            Some((vote.current_root, vote.next_epoch))
        }
    }

    /// Applies a validator's vote for `block_root` at `target_epoch`, to be
    /// reflected the next time `find_head` recomputes scores via
    /// `apply_score_changes`. Matches the teacher's "latest message wins,
    /// older message for the same validator is discarded" LMD semantics.
    pub fn process_attestation(
        &self,
        validator_index: usize,
        block_root: Hash256,
        target_epoch: Epoch,
    ) -> Result<(), String> {
        let mut votes = self.votes.write();
        let vote = votes.get_mut(validator_index);

        if target_epoch > vote.next_epoch || *vote == VoteTracker::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }

        Ok(())
    }

    pub fn find_head(
        &self,
        justified_epoch: Epoch,
        justified_root: Hash256,
        finalized_epoch: Epoch,
        justified_state_balances: &[u64],
    ) -> Result<Hash256, String> {
        let mut proto_array = self.proto_array.write();
        let mut votes = self.votes.write();
        let mut old_balances = self.balances.write();

        let deltas = compute_deltas(
            &proto_array.indices,
            &mut votes,
            &old_balances,
            justified_state_balances,
        )
        .map_err(|e| format!("find_head compute_deltas failed: {:?}", e))?;

        proto_array
            .apply_score_changes(deltas, justified_epoch, finalized_epoch)
            .map_err(|e| format!("find_head apply_score_changes failed: {:?}", e))?;

        *old_balances = justified_state_balances.to_vec();

        proto_array
            .find_head(&justified_root)
            .map_err(|e| format!("find_head failed: {:?}", e))
    }

    pub fn maybe_prune(&self, finalized_root: Hash256) -> Result<(), String> {
        let finalized_epoch = self.proto_array.read().finalized_epoch;
        self.proto_array
            .write()
            .maybe_prune(finalized_epoch, finalized_root)
            .map_err(|e| format!("maybe_prune failed: {:?}", e))
    }

    pub fn contains_block(&self, block_root: &Hash256) -> bool {
        self.proto_array.read().contains_block(block_root)
    }

    pub fn block_slot(&self, block_root: &Hash256) -> Option<Slot> {
        self.proto_array.read().block_slot(block_root)
    }

    pub fn is_descendant(&self, ancestor: Hash256, descendant: Hash256) -> bool {
        self.proto_array.read().is_descendant(ancestor, descendant)
    }

    pub fn len(&self) -> usize {
        self.proto_array.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the per-node weight deltas to feed `ProtoArray::apply_score_changes`,
/// from the change in each validator's last-known vote and the change in
/// validator balances between the previous and newly-justified state.
/// Mirrors the teacher's free function of the same name in
/// `proto_array_fork_choice.rs`.
fn compute_deltas(
    indices: &std::collections::HashMap<Hash256, usize>,
    votes: &mut ElasticList<VoteTracker>,
    old_balances: &[u64],
    new_balances: &[u64],
) -> Result<Vec<i64>, Error> {
    let mut deltas = vec![0_i64; indices.len()];

    for val_index in 0..votes.0.len() {
        let vote = votes.get_mut(val_index);

        if vote.current_root == Hash256::zero() && vote.next_root == Hash256::zero() {
            continue;
        }

        let old_balance = old_balances.get(val_index).copied().unwrap_or(0) as i64;
        let new_balance = new_balances.get(val_index).copied().unwrap_or(0) as i64;

        if vote.current_root != vote.next_root || old_balance != new_balance {
            if let Some(current_delta_index) = indices.get(&vote.current_root).copied() {
                let delta = deltas
                    .get_mut(current_delta_index)
                    .ok_or(Error::InvalidNodeDelta(current_delta_index))?;
                *delta -= old_balance;
            }

            if let Some(next_delta_index) = indices.get(&vote.next_root).copied() {
                let delta = deltas
                    .get_mut(next_delta_index)
                    .ok_or(Error::InvalidNodeDelta(next_delta_index))?;
                *delta += new_balance;
            }
        }

        vote.current_root = vote.next_root;
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child_block(root: Hash256, parent: Hash256, slot: Slot) -> Block {
        Block {
            slot,
            root,
            parent_root: Some(parent),
            state_root: Hash256::zero(),
            target_root: root,
            justified_epoch: Epoch::new(0),
            finalized_epoch: Epoch::new(0),
        }
    }

    #[test]
    fn genesis_is_head_with_no_votes() {
        let root = Hash256::repeat_byte(1);
        let fc = ProtoArrayForkChoice::new(Slot::new(0), Hash256::zero(), Epoch::new(0), Epoch::new(0), root)
            .expect("construct");
        let head = fc
            .find_head(Epoch::new(0), root, Epoch::new(0), &[])
            .expect("find head");
        assert_eq!(head, root);
    }

    #[test]
    fn process_block_is_idempotent() {
        let genesis = Hash256::repeat_byte(1);
        let fc = ProtoArrayForkChoice::new(Slot::new(0), Hash256::zero(), Epoch::new(0), Epoch::new(0), genesis)
            .expect("construct");
        let child = Hash256::repeat_byte(2);
        fc.process_block(child_block(child, genesis, Slot::new(1)))
            .expect("first insert");
        fc.process_block(child_block(child, genesis, Slot::new(1)))
            .expect("second insert is a no-op");
        assert_eq!(fc.len(), 2);
    }

    #[test]
    fn is_descendant_walks_parent_chain() {
        let genesis = Hash256::repeat_byte(1);
        let fc = ProtoArrayForkChoice::new(Slot::new(0), Hash256::zero(), Epoch::new(0), Epoch::new(0), genesis)
            .expect("construct");
        let child = Hash256::repeat_byte(2);
        fc.process_block(child_block(child, genesis, Slot::new(1)))
            .expect("insert");
        assert!(fc.is_descendant(genesis, child));
        assert!(!fc.is_descendant(child, genesis));
    }
}
