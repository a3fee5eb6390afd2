//! Fork choice: the single-writer component that decides the canonical head
//! of the chain from the blocks and attestations it has been told about.
//!
//! Exposed to the rest of the pipeline exclusively through `ForkChoice`,
//! which owns a `proto_array_fork_choice::ProtoArrayForkChoice` DAG and a
//! `ForkChoiceStore` implementation supplying checkpoints and balances. The
//! Fork-Choice Gateway (`beacon_chain::fork_choice_gateway`) wraps a single
//! `ForkChoice` behind a command-channel actor so that mutation is always
//! serialized through one task.

mod fork_choice;
mod store_trait;

pub use crate::fork_choice::{
    BlockImport, Error, ForkChoice, InvalidAttestation, InvalidBlock, QueuedAttestation,
    SAFE_SLOTS_TO_UPDATE_JUSTIFIED,
};
pub use proto_array::Block as ProtoBlock;
pub use store_trait::ForkChoiceStore;
