use serde_derive::{Deserialize, Serialize};

use crate::{Attestation, AggregateSignature, ValidatorIndex};

/// A validator's aggregate attestation and the selection proof permitting
/// them to publish it. Mirrors the teacher's `AggregateAndProof`, dropping
/// the `EthSpec` generic (this workspace's `Attestation` isn't generic over
/// it) and the `SecretKey`-driven constructor: selection proofs are produced
/// and checked entirely outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateAndProof {
    /// The index of the validator that created the aggregate.
    pub aggregator_index: ValidatorIndex,
    pub aggregate: Attestation,
    /// Proof that `aggregator_index` was selected to aggregate for this slot/committee.
    pub selection_proof: AggregateSignature,
}

/// The gossiped envelope around an `AggregateAndProof`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedAggregateAndProof {
    pub message: AggregateAndProof,
    pub signature: AggregateSignature,
}
