//! Component D: the orchestrator. Owns the three waiting areas exclusively,
//! drives validation → apply → park/retry, subscribes to slot ticks and
//! block imports, and fans out accepted attestations to subscribers.
//! Mirrors `events.rs`'s `ServerSentEventHandler` for the subscriber sets
//! (same channel-per-topic `tokio::sync::broadcast` shape) and the
//! `attestation_verification.rs` → `fork_choice` data flow for the state
//! machine itself.

use crate::attestation_verification::{
    validate_aggregate, validate_unaggregated, AggregateValidationContext, CommitteeResolver,
    Error, InternalValidationResult, ValidationContext,
};
use crate::chain_config::ChainConfig;
use crate::errors::BeaconChainError;
use crate::fork_choice_gateway::{AttestationProcessingResult, ForkChoiceGateway};
use crate::metrics;
use crate::naive_aggregation_pool::AggregatingAttestationPool;
use crate::observed_attestations::ObservedAttestations;
use crate::observed_attesters::ObservedAttesters;
use crate::signature_verification_service::SignatureVerificationService;
use crate::waiting_areas::{DeferredAttestations, FutureItems, PendingPool};
use slog::{debug, Logger};
use std::sync::Mutex;
use tokio::sync::broadcast;
use types::{Attestation, Hash256, IndexedAttestation, SignedAggregateAndProof, Slot};

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Returned to the original submitter of `add_attestation`/`add_aggregate`.
/// Per §9's open question, only the validation outcome is surfaced to the
/// caller; a failure during the subsequent apply step is logged but not
/// propagated back here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    SavedForFuture,
    Ignored,
    Rejected(Error),
}

/// Marks whether a locally produced attestation has already been handed to
/// the "to send" subscriber set, so it transitions to gossiped at most once.
#[derive(Clone)]
struct ToSend {
    attestation: IndexedAttestation,
    already_sent: bool,
}

pub struct AttestationManager<C> {
    pending: Mutex<PendingPool>,
    future: Mutex<FutureItems>,
    deferred: Mutex<DeferredAttestations>,
    observed_attestations: Mutex<ObservedAttestations>,
    observed_attesters: Mutex<ObservedAttesters>,
    observed_aggregators: Mutex<ObservedAttesters>,
    pool: Mutex<AggregatingAttestationPool>,
    signature_service: Mutex<Option<SignatureVerificationService>>,
    to_send: Mutex<Vec<ToSend>>,
    gateway: ForkChoiceGateway,
    committees: C,
    config: ChainConfig,
    slots_per_epoch: u64,
    all_valid_attestations_tx: broadcast::Sender<IndexedAttestation>,
    attestations_to_send_tx: broadcast::Sender<IndexedAttestation>,
    log: Logger,
}

impl<C> AttestationManager<C>
where
    C: CommitteeResolver,
{
    pub fn new(
        gateway: ForkChoiceGateway,
        committees: C,
        config: ChainConfig,
        slots_per_epoch: u64,
        log: Logger,
    ) -> Self {
        let (all_valid_attestations_tx, _) = broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let (attestations_to_send_tx, _) = broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY);

        Self {
            pending: Mutex::new(PendingPool::new(config.waiting_area_capacity, log.clone())),
            future: Mutex::new(FutureItems::new(config.waiting_area_capacity, log.clone())),
            deferred: Mutex::new(DeferredAttestations::new(config.waiting_area_capacity, log.clone())),
            observed_attestations: Mutex::new(ObservedAttestations::new(config.observed_epochs_stored)),
            observed_attesters: Mutex::new(ObservedAttesters::new(config.observed_epochs_stored)),
            observed_aggregators: Mutex::new(ObservedAttesters::new(config.observed_epochs_stored)),
            pool: Mutex::new(AggregatingAttestationPool::new()),
            signature_service: Mutex::new(None),
            to_send: Mutex::new(Vec::new()),
            gateway,
            committees,
            config,
            slots_per_epoch,
            all_valid_attestations_tx,
            attestations_to_send_tx,
            log,
        }
    }

    /// Spawns the Signature Verification Service and parks its handle,
    /// gating every subsequent ACCEPT/SAVE_FOR_FUTURE outcome on its
    /// batched verdicts. Owning its lifecycle here (rather than leaving
    /// callers to spawn it themselves) is what spec §4.B/§5 mean by "owned
    /// by the Attestation Manager".
    pub fn start<F>(&self, verify_fn: F, executor: &task_executor::TaskExecutor)
    where
        F: Fn(&[IndexedAttestation]) -> Vec<bool> + Send + 'static,
    {
        let service = SignatureVerificationService::spawn(
            self.config.signature_batch_deadline,
            self.config.signature_batch_size,
            verify_fn,
            self.log.clone(),
            executor,
        );
        *self.signature_service.lock().expect("lock poisoned") = Some(service);
    }

    /// Drops the service handle. Per §5, this is the first step of
    /// shutdown: outstanding batches fail (the service's channel closes
    /// and in-flight `verify` calls return `false`) before the gateway
    /// itself is closed by dropping the `AttestationManager`.
    pub fn stop(&self) {
        *self.signature_service.lock().expect("lock poisoned") = None;
    }

    /// Clones the current service handle out from behind the mutex before
    /// any `.await`, since a `std::sync::MutexGuard` can't be held across
    /// one.
    async fn check_signature(&self, indexed: &IndexedAttestation) -> bool {
        let service = self.signature_service.lock().expect("lock poisoned").clone();
        match service {
            Some(service) => service.verify(indexed.clone()).await,
            None => true,
        }
    }

    pub fn subscribe_all_valid_attestations(&self) -> broadcast::Receiver<IndexedAttestation> {
        self.all_valid_attestations_tx.subscribe()
    }

    pub fn subscribe_attestations_to_send(&self) -> broadcast::Receiver<IndexedAttestation> {
        self.attestations_to_send_tx.subscribe()
    }

    /// Entry point for a freshly received (individual or local) attestation.
    /// Validates, then—on ACCEPT/SAVE_FOR_FUTURE—calls through to fork
    /// choice via `on_attestation`, parking on any non-successful apply
    /// outcome exactly as the state machine in spec §4.D describes.
    pub async fn add_attestation(
        &self,
        attestation: Attestation,
        current_slot: Slot,
        produced_locally: bool,
        known_block_roots: &dyn Fn(Hash256) -> bool,
        known_target_roots: &dyn Fn(Hash256) -> bool,
    ) -> SubmissionOutcome {
        let raw = attestation.clone();
        let ctx = ValidationContext {
            current_slot,
            slots_per_epoch: self.slots_per_epoch,
            maximum_gossip_clock_disparity_slots: 0,
            head_block_root: Hash256::zero(),
            known_block_roots,
            known_target_roots,
            committees: &self.committees,
        };

        let validation_result = {
            let mut observed_attestations = self.observed_attestations.lock().expect("lock poisoned");
            let mut observed_attesters = self.observed_attesters.lock().expect("lock poisoned");
            validate_unaggregated(
                attestation,
                &ctx,
                &mut observed_attestations,
                &mut observed_attesters,
                &self.config,
            )
        };

        match validation_result {
            InternalValidationResult::Accept(indexed) => {
                if !self.check_signature(&indexed).await {
                    return SubmissionOutcome::Rejected(Error::InvalidSignature);
                }
                lighthouse_metrics::inc_counter(&metrics::ATTESTATION_PROCESSING_SUCCESSES);
                if produced_locally {
                    self.to_send.lock().expect("lock poisoned").push(ToSend {
                        attestation: indexed.clone(),
                        already_sent: false,
                    });
                }
                self.on_attestation(indexed, current_slot, Some(raw)).await;
                SubmissionOutcome::Accepted
            }
            InternalValidationResult::SaveForFuture(indexed) => {
                if !self.check_signature(&indexed).await {
                    return SubmissionOutcome::Rejected(Error::InvalidSignature);
                }
                self.on_attestation(indexed, current_slot, Some(raw)).await;
                SubmissionOutcome::SavedForFuture
            }
            InternalValidationResult::Ignore => SubmissionOutcome::Ignored,
            InternalValidationResult::Reject(e) => {
                metrics::register_attestation_error(&e);
                SubmissionOutcome::Rejected(e)
            }
        }
    }

    /// Aggregate-attestation counterpart to `add_attestation` (spec §4.B).
    /// `is_valid_selection_proof` stands in for BLS verification of the
    /// selection proof the same way `check_signature` stands in for the
    /// aggregate signature itself. A future-slot aggregate is rejected by
    /// `validate_aggregate` rather than ever reaching `SaveForFuture`, but
    /// that arm is kept for exhaustiveness since both validators share
    /// `InternalValidationResult`.
    pub async fn add_aggregate(
        &self,
        signed_aggregate: SignedAggregateAndProof,
        current_slot: Slot,
        produced_locally: bool,
        known_block_roots: &dyn Fn(Hash256) -> bool,
        known_target_roots: &dyn Fn(Hash256) -> bool,
        is_valid_selection_proof: &dyn Fn(&SignedAggregateAndProof, usize) -> bool,
    ) -> SubmissionOutcome {
        let raw = signed_aggregate.message.aggregate.clone();
        let ctx = AggregateValidationContext {
            inner: ValidationContext {
                current_slot,
                slots_per_epoch: self.slots_per_epoch,
                maximum_gossip_clock_disparity_slots: 0,
                head_block_root: Hash256::zero(),
                known_block_roots,
                known_target_roots,
                committees: &self.committees,
            },
            is_valid_selection_proof,
        };

        let validation_result = {
            let mut observed_attestations = self.observed_attestations.lock().expect("lock poisoned");
            let mut observed_aggregators = self.observed_aggregators.lock().expect("lock poisoned");
            validate_aggregate(
                signed_aggregate,
                &ctx,
                &mut observed_attestations,
                &mut observed_aggregators,
            )
        };

        match validation_result {
            InternalValidationResult::Accept(indexed) => {
                if !self.check_signature(&indexed).await {
                    return SubmissionOutcome::Rejected(Error::InvalidSignature);
                }
                lighthouse_metrics::inc_counter(&metrics::ATTESTATION_PROCESSING_SUCCESSES);
                if produced_locally {
                    self.to_send.lock().expect("lock poisoned").push(ToSend {
                        attestation: indexed.clone(),
                        already_sent: false,
                    });
                }
                self.on_attestation(indexed, current_slot, Some(raw)).await;
                SubmissionOutcome::Accepted
            }
            InternalValidationResult::SaveForFuture(indexed) => {
                if !self.check_signature(&indexed).await {
                    return SubmissionOutcome::Rejected(Error::InvalidSignature);
                }
                self.on_attestation(indexed, current_slot, Some(raw)).await;
                SubmissionOutcome::SavedForFuture
            }
            InternalValidationResult::Ignore => SubmissionOutcome::Ignored,
            InternalValidationResult::Reject(e) => {
                metrics::register_attestation_error(&e);
                SubmissionOutcome::Rejected(e)
            }
        }
    }

    /// Drives a validated attestation through the gateway, parking it if the
    /// apply step can't complete immediately. Duplicate suppression before
    /// this call (the "already in Pending" short-circuit from §4.D) is
    /// handled by checking `contains` up front. `raw` is the pre-indexed
    /// `Attestation` when one is available (fresh submissions only — the
    /// waiting areas store `IndexedAttestation` and can't reconstruct it),
    /// and is threaded through to `dispatch_result` for aggregating-pool
    /// insertion on success.
    async fn on_attestation(&self, attestation: IndexedAttestation, current_slot: Slot, raw: Option<Attestation>) {
        let root = attestation.data.beacon_block_root;
        if self.pending.lock().expect("lock poisoned").contains(&root, &attestation) {
            return;
        }

        let result = self.gateway.on_attestation(attestation.clone(), current_slot).await;
        self.dispatch_result(attestation, current_slot, result, raw);
    }

    fn dispatch_result(
        &self,
        attestation: IndexedAttestation,
        current_slot: Slot,
        result: AttestationProcessingResult,
        raw: Option<Attestation>,
    ) {
        match result {
            AttestationProcessingResult::Successful => {
                if let Some(raw) = raw {
                    if let Err(e) = self.pool.lock().expect("lock poisoned").insert(&raw) {
                        debug!(self.log, "Aggregating pool declined a fork-choice-accepted attestation"; "error" => ?e);
                    }
                }
                let _ = self.all_valid_attestations_tx.send(attestation);
            }
            AttestationProcessingResult::UnknownBlock(root) => {
                self.pending.lock().expect("lock poisoned").insert(root, attestation);
            }
            AttestationProcessingResult::DeferForkChoiceProcessing(_) => {
                self.deferred
                    .lock()
                    .expect("lock poisoned")
                    .insert(current_slot + Slot::new(1), attestation);
            }
            AttestationProcessingResult::SavedForFuture => {
                self.future
                    .lock()
                    .expect("lock poisoned")
                    .insert(attestation.data.slot, attestation);
            }
            AttestationProcessingResult::Invalid(reason) => {
                debug!(self.log, "Fork choice rejected a previously-validated attestation"; "reason" => reason);
            }
        }
    }

    /// Drains Deferred, then Future, in that order, per §5's ordering
    /// guarantee, applying each waiting area's contents as one batch
    /// through the gateway (`applyDeferredAttestations`/
    /// `applyIndexedAttestations`) rather than one call per attestation, so
    /// the whole batch lands within a single serialized gateway turn before
    /// subscribers are notified.
    pub async fn on_slot(&self, current_slot: Slot) -> Result<(), BeaconChainError> {
        let deferred_buckets = self.deferred.lock().expect("lock poisoned").prune(current_slot);
        let deferred_results = self.gateway.apply_deferred_attestations(deferred_buckets, current_slot).await;
        lighthouse_metrics::inc_counter_by(
            &metrics::ATTESTATIONS_DEFERRED_DRAINED_TOTAL,
            deferred_results.len() as u64,
        );
        for (attestation, result) in deferred_results {
            self.dispatch_result(attestation, current_slot, result, None);
        }

        let future_items = self.future.lock().expect("lock poisoned").prune(current_slot);
        lighthouse_metrics::inc_counter_by(
            &metrics::ATTESTATIONS_FUTURE_DRAINED_TOTAL,
            future_items.len() as u64,
        );
        let to_send_pending: Vec<_> = {
            let to_send = self.to_send.lock().expect("lock poisoned");
            to_send
                .iter()
                .filter(|entry| !entry.already_sent)
                .map(|entry| entry.attestation.data.clone())
                .collect()
        };
        let future_results = self.gateway.apply_indexed_attestations(future_items.clone(), current_slot).await;
        for (attestation, result) in future_items.into_iter().zip(future_results) {
            let is_to_send = to_send_pending.contains(&attestation.data);
            self.dispatch_result(attestation.clone(), current_slot, result, None);

            if is_to_send {
                self.mark_and_send(attestation);
            }
        }

        Ok(())
    }

    fn mark_and_send(&self, attestation: IndexedAttestation) {
        let mut to_send = self.to_send.lock().expect("lock poisoned");
        if let Some(entry) = to_send
            .iter_mut()
            .find(|entry| entry.attestation.data == attestation.data && !entry.already_sent)
        {
            entry.already_sent = true;
            let _ = self.attestations_to_send_tx.send(attestation);
        }
    }

    /// Notifies the active-validator tracker (a future extension point, not
    /// modeled concretely here — see DESIGN.md) and drains Pending[root(B)]
    /// entirely before returning, per §5's ordering guarantee.
    pub async fn on_block_imported(&self, block_root: Hash256, current_slot: Slot) {
        let pending = self.pending.lock().expect("lock poisoned").remove_for_block(&block_root);
        lighthouse_metrics::inc_counter_by(
            &metrics::ATTESTATIONS_PENDING_DRAINED_TOTAL,
            pending.len() as u64,
        );
        for attestation in pending {
            let result = self.gateway.on_attestation(attestation.clone(), current_slot).await;
            self.dispatch_result(attestation, current_slot, result, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitvec::prelude::{BitVec, Lsb0};
    use fork_choice::ForkChoice;
    use fork_choice::ForkChoiceStore;
    use types::{
        AggregateAndProof, AggregateSignature, AttestationData, Checkpoint, CommitteeIndex, Epoch,
        MainnetEthSpec, ValidatorIndex,
    };

    type E = MainnetEthSpec;

    struct FixedCommittee;
    impl CommitteeResolver for FixedCommittee {
        fn committee(&self, _slot: Slot, _index: CommitteeIndex) -> Option<Vec<ValidatorIndex>> {
            Some(vec![10, 11, 12, 13])
        }
    }

    #[derive(Debug)]
    struct TestStoreError;

    struct TestStore {
        current_slot: Slot,
        justified_checkpoint: Checkpoint,
        best_justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
        balances: Vec<u64>,
    }

    impl TestStore {
        fn new() -> Self {
            let checkpoint = Checkpoint::new(Epoch::new(0), Hash256::zero());
            Self {
                current_slot: Slot::new(0),
                justified_checkpoint: checkpoint,
                best_justified_checkpoint: checkpoint,
                finalized_checkpoint: checkpoint,
                balances: vec![32_000_000_000; 4],
            }
        }
    }

    impl ForkChoiceStore for TestStore {
        type Error = TestStoreError;

        fn get_current_slot(&self) -> Slot {
            self.current_slot
        }

        fn set_current_slot(&mut self, slot: Slot) {
            self.current_slot = slot;
        }

        fn justified_checkpoint(&self) -> Checkpoint {
            self.justified_checkpoint
        }

        fn justified_balances(&self) -> &[u64] {
            &self.balances
        }

        fn best_justified_checkpoint(&self) -> Checkpoint {
            self.best_justified_checkpoint
        }

        fn finalized_checkpoint(&self) -> Checkpoint {
            self.finalized_checkpoint
        }

        fn set_justified_checkpoint(&mut self, checkpoint: Checkpoint, balances: Vec<u64>) -> Result<(), Self::Error> {
            self.justified_checkpoint = checkpoint;
            self.balances = balances;
            Ok(())
        }

        fn set_best_justified_checkpoint(&mut self, checkpoint: Checkpoint) {
            self.best_justified_checkpoint = checkpoint;
        }

        fn set_finalized_checkpoint(&mut self, checkpoint: Checkpoint) {
            self.finalized_checkpoint = checkpoint;
        }

        fn set_justified_checkpoint_to_best_justified_checkpoint(&mut self) -> Result<(), Self::Error> {
            self.justified_checkpoint = self.best_justified_checkpoint;
            Ok(())
        }

        fn ancestor_at_slot(&self, block_root: Hash256, _ancestor_slot: Slot) -> Result<Hash256, Self::Error> {
            Ok(block_root)
        }

        fn after_block(&mut self, _block_root: Hash256, _justified_checkpoint: Checkpoint, _finalized_checkpoint: Checkpoint) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn genesis_root() -> Hash256 {
        Hash256::repeat_byte(0)
    }

    fn manager_with_gateway(
        executor: &task_executor::TaskExecutor,
    ) -> (AttestationManager<FixedCommittee>, ForkChoiceGateway) {
        let fork_choice = ForkChoice::<TestStore, E>::from_genesis(
            TestStore::new(),
            genesis_root(),
            Slot::new(0),
            Hash256::repeat_byte(1),
        )
        .expect("genesis fork choice constructs");
        let gateway = ForkChoiceGateway::spawn(fork_choice, test_logger(), executor);
        let manager = AttestationManager::new(
            gateway.clone(),
            FixedCommittee,
            ChainConfig::default(),
            32,
            test_logger(),
        );
        (manager, gateway)
    }

    fn manager(executor: &task_executor::TaskExecutor) -> AttestationManager<FixedCommittee> {
        manager_with_gateway(executor).0
    }

    fn attestation(slot: u64, bit: usize, block_root: Hash256) -> Attestation {
        let mut bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 4);
        bits.set(bit, true);
        Attestation {
            aggregation_bits: bits,
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: block_root,
                source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                target: Checkpoint::new(Slot::new(slot).epoch(32), block_root),
            },
            signature: AggregateSignature::empty(),
        }
    }

    #[test]
    fn accepted_attestation_to_known_block_is_broadcast() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);
        let mut subscriber = manager.subscribe_all_valid_attestations();

        let outcome = executor.handle().block_on(manager.add_attestation(
            attestation(0, 0, genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
        ));

        assert_eq!(outcome, SubmissionOutcome::Accepted);
        let received = executor.handle().block_on(subscriber.recv()).expect("broadcast delivered");
        assert_eq!(received.data.beacon_block_root, genesis_root());
    }

    #[test]
    fn attestation_to_unknown_block_parks_in_pending() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let (manager, gateway) = manager_with_gateway(&executor);

        let new_root = Hash256::repeat_byte(9);
        let outcome = executor.handle().block_on(manager.add_attestation(
            attestation(1, 0, new_root),
            Slot::new(1),
            false,
            &|_| true,
            &|_| true,
        ));
        assert_eq!(outcome, SubmissionOutcome::Accepted);

        let mut subscriber = manager.subscribe_all_valid_attestations();

        executor
            .handle()
            .block_on(gateway.on_block(
                fork_choice::BlockImport {
                    slot: Slot::new(1),
                    block_root: new_root,
                    parent_root: genesis_root(),
                    state_root: Hash256::repeat_byte(2),
                    target_root: new_root,
                    current_justified_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                    finalized_checkpoint: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                    justified_balances: vec![32_000_000_000; 4],
                },
                Slot::new(1),
            ))
            .expect("block registers with fork choice");

        executor
            .handle()
            .block_on(manager.on_block_imported(new_root, Slot::new(1)));

        let received = executor.handle().block_on(subscriber.recv()).expect("broadcast delivered");
        assert_eq!(received.data.beacon_block_root, new_root);
    }

    #[test]
    fn malformed_attestation_is_rejected() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);

        let mut bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 4);
        bits.set(0, true);
        bits.set(1, true);
        let mut malformed = attestation(0, 0, genesis_root());
        malformed.aggregation_bits = bits;

        let outcome = executor.handle().block_on(manager.add_attestation(
            malformed,
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
        ));

        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected(Error::NotExactlyOneAggregationBitSet(2))
        ));
    }

    fn aggregate(slot: u64, aggregator_index: ValidatorIndex, bits: &[usize], block_root: Hash256) -> SignedAggregateAndProof {
        let mut aggregation_bits: BitVec<Lsb0, u8> = BitVec::repeat(false, 4);
        for bit in bits {
            aggregation_bits.set(*bit, true);
        }
        let message = AggregateAndProof {
            aggregator_index,
            aggregate: Attestation {
                aggregation_bits,
                data: AttestationData {
                    slot: Slot::new(slot),
                    index: 0,
                    beacon_block_root: block_root,
                    source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                    target: Checkpoint::new(Slot::new(slot).epoch(32), block_root),
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

    #[test]
    fn accepted_aggregate_from_committee_member_is_broadcast() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);
        let mut subscriber = manager.subscribe_all_valid_attestations();

        let outcome = executor.handle().block_on(manager.add_aggregate(
            aggregate(0, 10, &[0], genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
            &|_, _| true,
        ));

        assert_eq!(outcome, SubmissionOutcome::Accepted);
        let received = executor.handle().block_on(subscriber.recv()).expect("broadcast delivered");
        assert_eq!(received.attesting_indices, vec![10]);
    }

    #[test]
    fn aggregate_with_invalid_selection_proof_is_rejected() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);

        let outcome = executor.handle().block_on(manager.add_aggregate(
            aggregate(0, 10, &[0], genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
            &|_, _| false,
        ));

        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected(Error::InvalidSelectionProof { aggregator_index: 10 })
        ));
    }

    #[test]
    fn signature_service_rejects_attestation_when_verify_fn_fails() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);
        manager.start(|batch| vec![false; batch.len()], &executor);

        let outcome = executor.handle().block_on(manager.add_attestation(
            attestation(0, 0, genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
        ));

        assert_eq!(outcome, SubmissionOutcome::Rejected(Error::InvalidSignature));
    }

    #[test]
    fn stop_reverts_to_accepting_without_a_signature_service() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);
        manager.start(|batch| vec![false; batch.len()], &executor);
        manager.stop();

        let outcome = executor.handle().block_on(manager.add_attestation(
            attestation(0, 0, genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
        ));

        assert_eq!(outcome, SubmissionOutcome::Accepted);
    }

    #[test]
    fn successful_attestation_is_inserted_into_aggregating_pool() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);

        let outcome = executor.handle().block_on(manager.add_attestation(
            attestation(0, 0, genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
        ));
        assert_eq!(outcome, SubmissionOutcome::Accepted);

        let root = attestation(0, 0, genesis_root()).data.tree_hash_root();
        let pool = manager.pool.lock().expect("lock poisoned");
        assert!(pool.get(Slot::new(0), &root).is_some());
    }

    #[test]
    fn on_slot_drains_future_items_as_a_single_batch() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let manager = manager(&executor);
        let mut subscriber = manager.subscribe_all_valid_attestations();

        let outcome = executor.handle().block_on(manager.add_attestation(
            attestation(5, 0, genesis_root()),
            Slot::new(0),
            false,
            &|_| true,
            &|_| true,
        ));
        assert_eq!(outcome, SubmissionOutcome::SavedForFuture);

        executor.handle().block_on(manager.on_slot(Slot::new(5))).expect("on_slot succeeds");

        let received = executor.handle().block_on(subscriber.recv()).expect("broadcast delivered");
        assert_eq!(received.data.slot, Slot::new(5));
    }
}
