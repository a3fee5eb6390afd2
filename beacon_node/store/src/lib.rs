//! Everything downstream of "a block has been verified and fork choice has
//! an opinion about the head" needs somewhere to read and write chain data.
//! This crate provides that: historical block/state lookups behind a
//! `StorageQuery` trait (Component F's storage seam — no on-disk engine is
//! implemented here), a pure state-advance function plus a `Regenerator`
//! that walks a known state forward to a requested slot and refuses to walk
//! past it (Component E), and `RecentChainData`, the cached read path that
//! ties the two together into the Combined Chain Data Service's full query
//! surface (block/state by slot or root, finalization, ancestry walks).

mod chain_data;
mod chain_state;
mod errors;
mod historical;
pub mod metrics;
mod regen;

pub use chain_data::{RecentChainData, DEFAULT_STATE_CACHE_SIZE};
pub use chain_state::{advance_one_slot, ChainState};
pub use errors::Error;
pub use historical::{InMemoryStore, StorageQuery};
pub use regen::Regenerator;
