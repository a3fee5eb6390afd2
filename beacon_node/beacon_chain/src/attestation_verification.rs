//! Component B: stateless-per-call validation of individual and aggregate
//! attestations. Mirrors the teacher's `attestation_verification.rs` in
//! shape (an `Error` enum closely tracking the teacher's variant set, and a
//! wrapper-type pipeline culminating in something fork choice can apply)
//! but without the SSZ/BLS/committee-shuffling machinery this workspace's
//! simplified `types` crate doesn't carry.
//!
//! Committee resolution (turning `aggregation_bits` into validator indices)
//! is out of scope here the same way BLS signature verification is: both
//! are delegated to a `CommitteeResolver` supplied by the caller rather than
//! computed from a full `BeaconState`.

use crate::chain_config::ChainConfig;
use crate::observed_attestations::{ObserveOutcome, ObservedAttestations};
use crate::observed_attesters::ObservedAttesters;
use types::{
    Attestation, CommitteeIndex, Epoch, Hash256, IndexedAttestation, SignedAggregateAndProof,
    Slot, ValidatorIndex,
};

/// Returned when an attestation is not declared valid. Mirrors the
/// teacher's `Error` enum in `attestation_verification.rs` almost
/// one-for-one: the variants describing timing and known-ness are kept
/// verbatim in spirit, the committee/signature-specific variants are
/// trimmed to the ones a `CommitteeResolver`-based design still needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    FutureSlot {
        attestation_slot: Slot,
        latest_permissible_slot: Slot,
    },
    PastSlot {
        attestation_slot: Slot,
        earliest_permissible_slot: Slot,
    },
    EmptyAggregationBitfield,
    NotExactlyOneAggregationBitSet(usize),
    AttestationAlreadyKnown(Hash256),
    PriorAttestationKnown {
        validator_index: ValidatorIndex,
        epoch: Epoch,
    },
    UnknownHeadBlock {
        beacon_block_root: Hash256,
    },
    BadTargetEpoch,
    UnknownTargetRoot(Hash256),
    FutureEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    PastEpoch {
        attestation_epoch: Epoch,
        current_epoch: Epoch,
    },
    AttestsToFutureBlock {
        block: Slot,
        attestation: Slot,
    },
    NoCommitteeForSlotAndIndex {
        slot: Slot,
        index: CommitteeIndex,
    },
    InvalidSelectionProof {
        aggregator_index: ValidatorIndex,
    },
    AggregatorNotInCommittee {
        aggregator_index: ValidatorIndex,
    },
    AggregatorAlreadyKnown(ValidatorIndex),
    InvalidSignature,
}

impl Error {
    /// A stable label for `metrics::register_attestation_error`'s
    /// per-variant counter, mirroring the teacher's dispatch-by-variant
    /// idiom in `network/src/metrics.rs`.
    pub fn as_metric_label(&self) -> &'static str {
        match self {
            Error::FutureSlot { .. } => "future_slot",
            Error::PastSlot { .. } => "past_slot",
            Error::EmptyAggregationBitfield => "empty_aggregation_bitfield",
            Error::NotExactlyOneAggregationBitSet(_) => "not_exactly_one_aggregation_bit_set",
            Error::AttestationAlreadyKnown(_) => "attestation_already_known",
            Error::PriorAttestationKnown { .. } => "prior_attestation_known",
            Error::UnknownHeadBlock { .. } => "unknown_head_block",
            Error::BadTargetEpoch => "bad_target_epoch",
            Error::UnknownTargetRoot(_) => "unknown_target_root",
            Error::FutureEpoch { .. } => "future_epoch",
            Error::PastEpoch { .. } => "past_epoch",
            Error::AttestsToFutureBlock { .. } => "attests_to_future_block",
            Error::NoCommitteeForSlotAndIndex { .. } => "no_committee_for_slot_and_index",
            Error::InvalidSelectionProof { .. } => "invalid_selection_proof",
            Error::AggregatorNotInCommittee { .. } => "aggregator_not_in_committee",
            Error::AggregatorAlreadyKnown(_) => "aggregator_already_known",
            Error::InvalidSignature => "invalid_signature",
        }
    }
}

/// The outcome of validating a single attestation, per spec §4.B / §9's
/// `InternalValidationResult` sum type.
#[derive(Debug)]
pub enum InternalValidationResult {
    Accept(IndexedAttestation),
    SaveForFuture(IndexedAttestation),
    Ignore,
    Reject(Error),
}

/// Resolves an `Attestation`'s committee bits to the validator indices the
/// bits represent. A full implementation derives this from a `BeaconState`
/// shuffling; here it is a trait boundary so this module stays decoupled
/// from state management, matching how `attestation_verification.rs`
/// treats `get_indexed_attestation` as a `state_processing` collaborator.
pub trait CommitteeResolver {
    fn committee(&self, slot: Slot, index: CommitteeIndex) -> Option<Vec<ValidatorIndex>>;
}

/// Collaborators the validators need in order to classify timing and
/// known-ness, grouped the way the teacher threads `&BeaconChain<T>`
/// through its verification functions.
pub struct ValidationContext<'a, C: CommitteeResolver> {
    pub current_slot: Slot,
    pub slots_per_epoch: u64,
    pub maximum_gossip_clock_disparity_slots: u64,
    pub head_block_root: Hash256,
    pub known_block_roots: &'a dyn Fn(Hash256) -> bool,
    pub known_target_roots: &'a dyn Fn(Hash256) -> bool,
    pub committees: &'a C,
}

/// Collaborators unique to aggregate validation, layered on top of
/// `ValidationContext`'s individual-attestation checks. `is_valid_selection_proof`
/// stands in for the teacher's `SelectionProof::is_aggregator`, the same way
/// `committees` stands in for shuffling-derived committee lookups.
pub struct AggregateValidationContext<'a, C: CommitteeResolver> {
    pub inner: ValidationContext<'a, C>,
    pub is_valid_selection_proof: &'a dyn Fn(&SignedAggregateAndProof, usize) -> bool,
}

/// Validates an unaggregated `Attestation`, mirroring
/// `attestation_verification::VerifiedUnaggregatedAttestation`'s checks.
pub fn validate_unaggregated<C: CommitteeResolver>(
    attestation: Attestation,
    ctx: &ValidationContext<C>,
    observed_attestations: &mut ObservedAttestations,
    observed_attesters: &mut ObservedAttesters,
    _config: &ChainConfig,
) -> InternalValidationResult {
    if attestation.num_set_bits() == 0 {
        return InternalValidationResult::Reject(Error::EmptyAggregationBitfield);
    }
    if attestation.num_set_bits() != 1 {
        return InternalValidationResult::Reject(Error::NotExactlyOneAggregationBitSet(
            attestation.num_set_bits(),
        ));
    }

    match classify_timing(&attestation.data.slot, ctx) {
        Timing::TooFarFuture => {
            return InternalValidationResult::Reject(Error::FutureSlot {
                attestation_slot: attestation.data.slot,
                latest_permissible_slot: ctx.current_slot,
            })
        }
        Timing::TooFarPast => {
            return InternalValidationResult::Reject(Error::PastSlot {
                attestation_slot: attestation.data.slot,
                earliest_permissible_slot: ctx
                    .current_slot
                    .saturating_sub(Slot::new(ctx.maximum_gossip_clock_disparity_slots)),
            })
        }
        Timing::Future => {
            let indexed = resolve_committee(&attestation, ctx);
            return match indexed {
                Some(indexed) => InternalValidationResult::SaveForFuture(indexed),
                None => InternalValidationResult::Reject(Error::NoCommitteeForSlotAndIndex {
                    slot: attestation.data.slot,
                    index: attestation.data.index,
                }),
            };
        }
        Timing::Current => {}
    }

    if let Some(err) = check_target(&attestation.data.target.epoch, &attestation.data.slot, ctx) {
        return InternalValidationResult::Reject(err);
    }

    if !(ctx.known_block_roots)(attestation.data.beacon_block_root) {
        return InternalValidationResult::Reject(Error::UnknownHeadBlock {
            beacon_block_root: attestation.data.beacon_block_root,
        });
    }
    if !(ctx.known_target_roots)(attestation.data.target.root) {
        return InternalValidationResult::Reject(Error::UnknownTargetRoot(
            attestation.data.target.root,
        ));
    }

    let indexed = match resolve_committee(&attestation, ctx) {
        Some(indexed) => indexed,
        None => {
            return InternalValidationResult::Reject(Error::NoCommitteeForSlotAndIndex {
                slot: attestation.data.slot,
                index: attestation.data.index,
            })
        }
    };

    let root = indexed.data.tree_hash_root();
    match observed_attestations.observe_item(indexed.data.target.epoch, root) {
        Ok(ObserveOutcome::AlreadyKnown) => {
            return InternalValidationResult::Reject(Error::AttestationAlreadyKnown(root))
        }
        Ok(ObserveOutcome::New) => {}
        Err(_) => return InternalValidationResult::Ignore,
    }

    for validator_index in &indexed.attesting_indices {
        match observed_attesters.observe_validator(indexed.data.target.epoch, *validator_index) {
            Ok(true) => {
                return InternalValidationResult::Reject(Error::PriorAttestationKnown {
                    validator_index: *validator_index,
                    epoch: indexed.data.target.epoch,
                })
            }
            Ok(false) => {}
            Err(_) => return InternalValidationResult::Ignore,
        }
    }

    InternalValidationResult::Accept(indexed)
}

enum Timing {
    TooFarPast,
    TooFarFuture,
    Future,
    Current,
}

fn classify_timing<C: CommitteeResolver>(slot: &Slot, ctx: &ValidationContext<C>) -> Timing {
    let disparity = Slot::new(ctx.maximum_gossip_clock_disparity_slots);
    if *slot > ctx.current_slot + disparity {
        if *slot > ctx.current_slot {
            return Timing::Future;
        }
        Timing::TooFarFuture
    } else if *slot + disparity < ctx.current_slot {
        Timing::TooFarPast
    } else if *slot > ctx.current_slot {
        Timing::Future
    } else {
        Timing::Current
    }
}

fn check_target<C: CommitteeResolver>(
    target_epoch: &Epoch,
    slot: &Slot,
    ctx: &ValidationContext<C>,
) -> Option<Error> {
    if slot.epoch(ctx.slots_per_epoch) != *target_epoch {
        return Some(Error::BadTargetEpoch);
    }
    let current_epoch = ctx.current_slot.epoch(ctx.slots_per_epoch);
    if *target_epoch > current_epoch {
        return Some(Error::FutureEpoch {
            attestation_epoch: *target_epoch,
            current_epoch,
        });
    }
    None
}

fn resolve_committee<C: CommitteeResolver>(
    attestation: &Attestation,
    ctx: &ValidationContext<C>,
) -> Option<IndexedAttestation> {
    let committee = ctx
        .committees
        .committee(attestation.data.slot, attestation.data.index)?;
    Some(indexed_from_committee(attestation, committee))
}

/// Resolves `attestation`'s committee bitfield into validator indices given
/// an already-looked-up `committee`, shared by both the individual and
/// aggregate validation paths.
fn indexed_from_committee(attestation: &Attestation, committee: Vec<ValidatorIndex>) -> IndexedAttestation {
    let attesting_indices: Vec<ValidatorIndex> = committee
        .into_iter()
        .enumerate()
        .filter(|(i, _)| attestation.aggregation_bits.get(*i).map(|b| *b).unwrap_or(false))
        .map(|(_, index)| index)
        .collect();

    IndexedAttestation {
        attesting_indices,
        data: attestation.data.clone(),
        signature: attestation.signature.clone(),
    }
}

/// Validates a `SignedAggregateAndProof`, mirroring
/// `attestation_verification::VerifiedAggregatedAttestation::verify`'s
/// checks: propagation timing, known-ness of the aggregate and its
/// aggregator, the aggregator's selection proof and committee membership,
/// then the same known-block/known-target/duplicate checks individual
/// attestations go through. BLS verification of the resulting
/// `IndexedAttestation` is left to the caller (the Signature Verification
/// Service), exactly as for `validate_unaggregated`.
///
/// Unlike individual attestations, a future-slot aggregate is rejected
/// rather than saved for later: the teacher does not queue future
/// aggregates for later processing, since by the time its slot arrives the
/// selection proof window has likely passed.
pub fn validate_aggregate<C: CommitteeResolver>(
    signed_aggregate: SignedAggregateAndProof,
    ctx: &AggregateValidationContext<C>,
    observed_attestations: &mut ObservedAttestations,
    observed_aggregators: &mut ObservedAttesters,
) -> InternalValidationResult {
    let aggregator_index = signed_aggregate.message.aggregator_index;
    let attestation = signed_aggregate.message.aggregate.clone();

    if attestation.num_set_bits() == 0 {
        return InternalValidationResult::Reject(Error::EmptyAggregationBitfield);
    }

    match classify_timing(&attestation.data.slot, &ctx.inner) {
        Timing::TooFarFuture | Timing::Future => {
            return InternalValidationResult::Reject(Error::FutureSlot {
                attestation_slot: attestation.data.slot,
                latest_permissible_slot: ctx.inner.current_slot,
            })
        }
        Timing::TooFarPast => {
            return InternalValidationResult::Reject(Error::PastSlot {
                attestation_slot: attestation.data.slot,
                earliest_permissible_slot: ctx
                    .inner
                    .current_slot
                    .saturating_sub(Slot::new(ctx.inner.maximum_gossip_clock_disparity_slots)),
            })
        }
        Timing::Current => {}
    }

    if let Some(err) = check_target(&attestation.data.target.epoch, &attestation.data.slot, &ctx.inner) {
        return InternalValidationResult::Reject(err);
    }

    let attestation_root = attestation.data.tree_hash_root();
    match observed_attestations.observe_item(attestation.data.target.epoch, attestation_root) {
        Ok(ObserveOutcome::AlreadyKnown) => {
            return InternalValidationResult::Reject(Error::AttestationAlreadyKnown(attestation_root))
        }
        Ok(ObserveOutcome::New) => {}
        Err(_) => return InternalValidationResult::Ignore,
    }

    match observed_aggregators.observe_validator(attestation.data.target.epoch, aggregator_index) {
        Ok(true) => return InternalValidationResult::Reject(Error::AggregatorAlreadyKnown(aggregator_index)),
        Ok(false) => {}
        Err(_) => return InternalValidationResult::Ignore,
    }

    if !(ctx.inner.known_block_roots)(attestation.data.beacon_block_root) {
        return InternalValidationResult::Reject(Error::UnknownHeadBlock {
            beacon_block_root: attestation.data.beacon_block_root,
        });
    }
    if !(ctx.inner.known_target_roots)(attestation.data.target.root) {
        return InternalValidationResult::Reject(Error::UnknownTargetRoot(
            attestation.data.target.root,
        ));
    }

    let committee = match ctx
        .inner
        .committees
        .committee(attestation.data.slot, attestation.data.index)
    {
        Some(committee) => committee,
        None => {
            return InternalValidationResult::Reject(Error::NoCommitteeForSlotAndIndex {
                slot: attestation.data.slot,
                index: attestation.data.index,
            })
        }
    };

    if !(ctx.is_valid_selection_proof)(&signed_aggregate, committee.len()) {
        return InternalValidationResult::Reject(Error::InvalidSelectionProof { aggregator_index });
    }

    if !committee.iter().any(|index| *index == aggregator_index) {
        return InternalValidationResult::Reject(Error::AggregatorNotInCommittee { aggregator_index });
    }

    InternalValidationResult::Accept(indexed_from_committee(&attestation, committee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::{BitVec, Lsb0};
    use types::{AggregateSignature, AttestationData, Checkpoint};

    struct FixedCommittee;
    impl CommitteeResolver for FixedCommittee {
        fn committee(&self, _slot: Slot, _index: CommitteeIndex) -> Option<Vec<ValidatorIndex>> {
            Some(vec![10, 11, 12, 13])
        }
    }

    fn attestation(slot: u64, bit: usize) -> Attestation {
        let mut bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 4);
        bits.set(bit, true);
        Attestation {
            aggregation_bits: bits,
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: Hash256::repeat_byte(1),
                source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                target: Checkpoint::new(Slot::new(slot).epoch(32), Hash256::repeat_byte(2)),
            },
            signature: AggregateSignature::empty(),
        }
    }

    fn ctx(current_slot: u64) -> ValidationContext<'static, FixedCommittee> {
        ValidationContext {
            current_slot: Slot::new(current_slot),
            slots_per_epoch: 32,
            maximum_gossip_clock_disparity_slots: 0,
            head_block_root: Hash256::repeat_byte(1),
            known_block_roots: &|_| true,
            known_target_roots: &|_| true,
            committees: &FixedCommittee,
        }
    }

    #[test]
    fn accepts_a_well_formed_current_slot_attestation() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_attesters = ObservedAttesters::new(4);
        let config = ChainConfig::default();

        let result = validate_unaggregated(
            attestation(5, 0),
            &ctx(5),
            &mut observed_attestations,
            &mut observed_attesters,
            &config,
        );

        match result {
            InternalValidationResult::Accept(indexed) => {
                assert_eq!(indexed.attesting_indices, vec![10]);
            }
            other => panic!("expected Accept, got {:?}", other),
        }
    }

    #[test]
    fn future_slot_attestation_is_saved_for_future() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_attesters = ObservedAttesters::new(4);
        let config = ChainConfig::default();

        let result = validate_unaggregated(
            attestation(7, 0),
            &ctx(5),
            &mut observed_attestations,
            &mut observed_attesters,
            &config,
        );

        assert!(matches!(result, InternalValidationResult::SaveForFuture(_)));
    }

    #[test]
    fn duplicate_attestation_is_rejected() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_attesters = ObservedAttesters::new(4);
        let config = ChainConfig::default();

        let first = validate_unaggregated(
            attestation(5, 0),
            &ctx(5),
            &mut observed_attestations,
            &mut observed_attesters,
            &config,
        );
        assert!(matches!(first, InternalValidationResult::Accept(_)));

        let second = validate_unaggregated(
            attestation(5, 0),
            &ctx(5),
            &mut observed_attestations,
            &mut observed_attesters,
            &config,
        );
        assert!(matches!(
            second,
            InternalValidationResult::Reject(Error::AttestationAlreadyKnown(_))
        ));
    }

    #[test]
    fn unknown_head_block_is_rejected() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_attesters = ObservedAttesters::new(4);
        let config = ChainConfig::default();

        let mut context = ctx(5);
        context.known_block_roots = &|_| false;

        let result = validate_unaggregated(
            attestation(5, 0),
            &context,
            &mut observed_attestations,
            &mut observed_attesters,
            &config,
        );

        assert!(matches!(
            result,
            InternalValidationResult::Reject(Error::UnknownHeadBlock { .. })
        ));
    }

    fn aggregate(slot: u64, aggregator_index: ValidatorIndex, bits: &[usize]) -> SignedAggregateAndProof {
        let mut aggregation_bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 4);
        for bit in bits {
            aggregation_bits.set(*bit, true);
        }
        let message = types::AggregateAndProof {
            aggregator_index,
            aggregate: Attestation {
                aggregation_bits,
                data: AttestationData {
                    slot: Slot::new(slot),
                    index: 0,
                    beacon_block_root: Hash256::repeat_byte(1),
                    source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                    target: Checkpoint::new(Slot::new(slot).epoch(32), Hash256::repeat_byte(2)),
                },
                signature: AggregateSignature::empty(),
            },
            selection_proof: AggregateSignature::empty(),
        };
        SignedAggregateAndProof {
            message,
            signature: AggregateSignature::empty(),
        }
    }

    fn aggregate_ctx(current_slot: u64) -> AggregateValidationContext<'static, FixedCommittee> {
        AggregateValidationContext {
            inner: ctx(current_slot),
            is_valid_selection_proof: &|_, _| true,
        }
    }

    #[test]
    fn accepts_a_well_formed_aggregate_from_a_committee_member() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_aggregators = ObservedAttesters::new(4);

        let result = validate_aggregate(
            aggregate(5, 10, &[0, 1]),
            &aggregate_ctx(5),
            &mut observed_attestations,
            &mut observed_aggregators,
        );

        match result {
            InternalValidationResult::Accept(indexed) => {
                assert_eq!(indexed.attesting_indices, vec![10, 11]);
            }
            other => panic!("expected Accept, got {:?}", other),
        }
    }

    #[test]
    fn future_slot_aggregate_is_rejected_not_parked() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_aggregators = ObservedAttesters::new(4);

        let result = validate_aggregate(
            aggregate(7, 10, &[0]),
            &aggregate_ctx(5),
            &mut observed_attestations,
            &mut observed_aggregators,
        );

        assert!(matches!(result, InternalValidationResult::Reject(Error::FutureSlot { .. })));
    }

    #[test]
    fn aggregator_not_in_committee_is_rejected() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_aggregators = ObservedAttesters::new(4);

        let result = validate_aggregate(
            aggregate(5, 999, &[0]),
            &aggregate_ctx(5),
            &mut observed_attestations,
            &mut observed_aggregators,
        );

        assert!(matches!(
            result,
            InternalValidationResult::Reject(Error::AggregatorNotInCommittee { aggregator_index: 999 })
        ));
    }

    #[test]
    fn invalid_selection_proof_is_rejected() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_aggregators = ObservedAttesters::new(4);
        let mut context = aggregate_ctx(5);
        context.is_valid_selection_proof = &|_, _| false;

        let result = validate_aggregate(
            aggregate(5, 10, &[0]),
            &context,
            &mut observed_attestations,
            &mut observed_aggregators,
        );

        assert!(matches!(
            result,
            InternalValidationResult::Reject(Error::InvalidSelectionProof { aggregator_index: 10 })
        ));
    }

    #[test]
    fn second_aggregate_from_same_aggregator_same_epoch_is_rejected() {
        let mut observed_attestations = ObservedAttestations::new(4);
        let mut observed_aggregators = ObservedAttesters::new(4);

        let first = validate_aggregate(
            aggregate(5, 10, &[0]),
            &aggregate_ctx(5),
            &mut observed_attestations,
            &mut observed_aggregators,
        );
        assert!(matches!(first, InternalValidationResult::Accept(_)));

        let second = validate_aggregate(
            aggregate(5, 10, &[1]),
            &aggregate_ctx(5),
            &mut observed_attestations,
            &mut observed_aggregators,
        );
        assert!(matches!(
            second,
            InternalValidationResult::Reject(Error::AggregatorAlreadyKnown(10))
        ));
    }
}
