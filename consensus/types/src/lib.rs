//! Consensus-layer primitives shared by the attestation ingestion pipeline and
//! the combined chain data access layer.
//!
//! This crate intentionally covers only the slice of "eth2 types" that the
//! pipeline touches: slots/epochs, block/state roots, attestations and their
//! indexed form, and the minimal `EthSpec` trait used to parameterise
//! generic code over network presets. Full SSZ/merkleization and validator
//! registry machinery are out of scope (state transition is a collaborator,
//! not something this crate re-implements).

mod aggregate_and_proof;
mod attestation;
mod beacon_block_header;
mod checkpoint;
mod eth_spec;
mod slot_epoch;

pub use aggregate_and_proof::{AggregateAndProof, SignedAggregateAndProof};
pub use attestation::{AggregateSignature, Attestation, AttestationData, IndexedAttestation};
pub use beacon_block_header::BeaconBlockHeader;
pub use checkpoint::Checkpoint;
pub use eth_spec::{EthSpec, MainnetEthSpec, MinimalEthSpec};
pub use slot_epoch::{Epoch, Slot};

pub type Hash256 = ethereum_types::H256;
pub type CommitteeIndex = u64;
pub type ValidatorIndex = u64;
