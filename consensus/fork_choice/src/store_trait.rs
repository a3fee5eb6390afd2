use std::fmt::Debug;
use types::{Checkpoint, Hash256, Slot};

/// Storage for `ForkChoice`, modelled off the fork-choice spec's `Store`
/// object. A real implementation is backed by the Combined Chain Data
/// Service (component F); tests use an in-memory implementation.
///
/// Deliberately does not expose a full `BeaconState` the way the teacher's
/// `ForkChoiceStore` does — block verification and state transition are
/// collaborators, not something `fork_choice` re-implements, so this trait
/// only asks for the checkpoints and balances it actually needs.
pub trait ForkChoiceStore: Send + Sync + Sized {
    type Error: Debug;

    fn get_current_slot(&self) -> Slot;

    fn set_current_slot(&mut self, slot: Slot);

    fn justified_checkpoint(&self) -> Checkpoint;

    /// Effective validator balances as of the justified checkpoint's state,
    /// indexed by validator index.
    fn justified_balances(&self) -> &[u64];

    fn best_justified_checkpoint(&self) -> Checkpoint;

    fn finalized_checkpoint(&self) -> Checkpoint;

    fn set_justified_checkpoint(
        &mut self,
        checkpoint: Checkpoint,
        balances: Vec<u64>,
    ) -> Result<(), Self::Error>;

    fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint);

    fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint);

    fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error>;

    /// Returns the ancestor of `block_root` at `ancestor_slot`, per
    /// `get_ancestor` in the fork-choice spec. Backed, in a full node, by the
    /// Combined Chain Data Service's historical block-root index.
    fn ancestor_at_slot(
        &self,
        block_root: Hash256,
        ancestor_slot: Slot,
    ) -> Result<Hash256, Self::Error>;

    /// Called once a block has been fully registered with fork choice, so
    /// the store can perform any bookkeeping that depends on the new head
    /// being reachable (e.g. notifying subscribers).
    fn after_block(
        &mut self,
        block_root: Hash256,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> Result<(), Self::Error>;
}
