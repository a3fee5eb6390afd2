//! Component C: the single writer into the fork-choice vote store.
//!
//! Implemented as a single-task actor reading a `tokio::sync::mpsc` command
//! channel and replying via `tokio::sync::oneshot` — the teacher's general
//! affinity for channel-based internal actors (e.g.
//! `network/src/router/gossip_processor.rs`'s worker pool), narrowed here to
//! exactly one worker because §5 requires strict single-writer
//! serialization of every mutation into `ForkChoice`.

use crate::metrics;
use crate::waiting_areas::DeferredVotes;
use fork_choice::{BlockImport, ForkChoice, ForkChoiceStore};
use slog::{debug, Logger};
use std::fmt::Debug;
use tokio::sync::{mpsc, oneshot};
use types::{EthSpec, Hash256, IndexedAttestation, Slot};

/// Mirrors `AttestationProcessingResult` from spec §9: the sum of outcomes
/// the gateway can produce for a single attestation application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationProcessingResult {
    Successful,
    UnknownBlock(Hash256),
    DeferForkChoiceProcessing(Slot),
    SavedForFuture,
    Invalid(String),
}

enum Command {
    OnAttestation {
        attestation: IndexedAttestation,
        current_slot: Slot,
        reply: oneshot::Sender<AttestationProcessingResult>,
    },
    OnAttestationBatch {
        attestations: Vec<IndexedAttestation>,
        current_slot: Slot,
        reply: oneshot::Sender<Vec<AttestationProcessingResult>>,
    },
    OnBlock {
        import: Box<BlockImport>,
        current_slot: Slot,
        reply: oneshot::Sender<Result<(), String>>,
    },
    GetHead {
        current_slot: Slot,
        reply: oneshot::Sender<Result<Hash256, String>>,
    },
}

/// A handle to the gateway actor; cheap to clone, every call round-trips
/// through the single serialized task that owns the real `ForkChoice`.
/// Not itself generic over `T`/`E` — those only matter to the task spawned
/// in `spawn`, which owns the real `ForkChoice<T, E>` exclusively.
#[derive(Clone)]
pub struct ForkChoiceGateway {
    tx: mpsc::Sender<Command>,
}

impl ForkChoiceGateway {
    pub fn spawn<T, E>(
        mut fork_choice: ForkChoice<T, E>,
        log: Logger,
        executor: &task_executor::TaskExecutor,
    ) -> Self
    where
        T: ForkChoiceStore + Send + 'static,
        T::Error: Debug + Send,
        E: EthSpec + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command>(256);

        executor.spawn(
            async move {
                while let Some(command) = rx.recv().await {
                    match command {
                        Command::OnAttestation {
                            attestation,
                            current_slot,
                            reply,
                        } => {
                            let timer =
                                lighthouse_metrics::start_timer(&metrics::FORK_CHOICE_PROCESS_ATTESTATION_TIME);
                            let result = apply_attestation(&mut fork_choice, attestation, current_slot, &log);
                            lighthouse_metrics::stop_timer(timer);
                            let _ = reply.send(result);
                        }
                        Command::OnAttestationBatch {
                            attestations,
                            current_slot,
                            reply,
                        } => {
                            let timer =
                                lighthouse_metrics::start_timer(&metrics::FORK_CHOICE_PROCESS_ATTESTATION_TIME);
                            let results = attestations
                                .into_iter()
                                .map(|attestation| apply_attestation(&mut fork_choice, attestation, current_slot, &log))
                                .collect();
                            lighthouse_metrics::stop_timer(timer);
                            let _ = reply.send(results);
                        }
                        Command::OnBlock {
                            import,
                            current_slot,
                            reply,
                        } => {
                            let timer =
                                lighthouse_metrics::start_timer(&metrics::FORK_CHOICE_PROCESS_BLOCK_TIME);
                            let result = fork_choice
                                .on_block(current_slot, &import)
                                .map_err(|e| format!("{:?}", e));
                            lighthouse_metrics::stop_timer(timer);
                            let _ = reply.send(result);
                        }
                        Command::GetHead { current_slot, reply } => {
                            let result = fork_choice
                                .get_head(current_slot)
                                .map_err(|e| format!("{:?}", e));
                            let _ = reply.send(result);
                        }
                    }
                }
                debug!(log, "Fork-choice gateway command channel closed, exiting");
            },
            "fork_choice_gateway",
        );

        Self { tx }
    }

    /// Idempotent for re-submission of the same attestation: the inner
    /// `ForkChoice`/`proto_array` already no-ops on an attestation whose
    /// vote is unchanged, mirroring `ForkChoice::on_attestation`'s
    /// already-known guards in the teacher.
    pub async fn on_attestation(
        &self,
        attestation: IndexedAttestation,
        current_slot: Slot,
    ) -> AttestationProcessingResult {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::OnAttestation {
                attestation,
                current_slot,
                reply,
            })
            .await
            .is_err()
        {
            return AttestationProcessingResult::Invalid("gateway shut down".to_string());
        }
        rx.await
            .unwrap_or(AttestationProcessingResult::Invalid("gateway dropped reply".to_string()))
    }

    /// Batch variant used when draining the Future waiting area
    /// (`applyIndexedAttestations` per spec §4.C): every attestation is
    /// applied within the same serialized turn of the gateway task, so the
    /// whole batch completes before any later command (e.g. a concurrent
    /// `onBlock`) is processed.
    pub async fn apply_indexed_attestations(
        &self,
        attestations: Vec<IndexedAttestation>,
        current_slot: Slot,
    ) -> Vec<AttestationProcessingResult> {
        if attestations.is_empty() {
            return Vec::new();
        }
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::OnAttestationBatch {
                attestations,
                current_slot,
                reply,
            })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Batch variant used when draining the Deferred waiting area
    /// (`applyDeferredAttestations` per spec §4.C): flattens every bucket's
    /// `DeferredVotes` into its collapsed per-validator attestations and
    /// applies them as a single batch, identically to
    /// `apply_indexed_attestations`. Returns each attestation paired with its
    /// outcome (rather than bare outcomes) so the caller can re-park or
    /// broadcast without needing to re-derive the flattened order itself.
    pub async fn apply_deferred_attestations(
        &self,
        votes: Vec<DeferredVotes>,
        current_slot: Slot,
    ) -> Vec<(IndexedAttestation, AttestationProcessingResult)> {
        let attestations: Vec<IndexedAttestation> =
            votes.into_iter().flat_map(DeferredVotes::into_attestations).collect();
        let results = self.apply_indexed_attestations(attestations.clone(), current_slot).await;
        attestations.into_iter().zip(results).collect()
    }

    pub async fn on_block(&self, import: BlockImport, current_slot: Slot) -> Result<(), String> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::OnBlock {
                import: Box::new(import),
                current_slot,
                reply,
            })
            .await
            .is_err()
        {
            return Err("gateway shut down".to_string());
        }
        rx.await.map_err(|_| "gateway dropped reply".to_string())?
    }

    pub async fn get_head(&self, current_slot: Slot) -> Result<Hash256, String> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::GetHead { current_slot, reply })
            .await
            .is_err()
        {
            return Err("gateway shut down".to_string());
        }
        rx.await.map_err(|_| "gateway dropped reply".to_string())?
    }
}

fn apply_attestation<T, E>(
    fork_choice: &mut ForkChoice<T, E>,
    attestation: IndexedAttestation,
    current_slot: Slot,
    log: &Logger,
) -> AttestationProcessingResult
where
    T: ForkChoiceStore,
    T::Error: Debug,
    E: EthSpec,
{
    // `validate_on_attestation` only rejects an epoch that's ahead of the
    // current one; a slot-only lookahead (still within the current epoch)
    // would otherwise be applied against a head the gateway can't yet judge.
    // Caught here, before fork choice ever sees it, so it parks in Future
    // rather than being silently accepted or misreported as invalid.
    if attestation.data.slot > current_slot {
        return AttestationProcessingResult::SavedForFuture;
    }

    if !fork_choice.contains_block(&attestation.data.beacon_block_root) {
        return AttestationProcessingResult::UnknownBlock(attestation.data.beacon_block_root);
    }

    match fork_choice.on_attestation(current_slot, &attestation) {
        Ok(()) => AttestationProcessingResult::Successful,
        Err(fork_choice::Error::InvalidAttestation(
            fork_choice::InvalidAttestation::UnknownHeadBlock { beacon_block_root },
        )) => AttestationProcessingResult::UnknownBlock(beacon_block_root),
        // A target epoch ahead of the current one means fork choice can't yet
        // tell whether the attestation is valid; the manager re-evaluates it
        // on the next slot tick rather than rejecting it outright.
        Err(fork_choice::Error::InvalidAttestation(
            fork_choice::InvalidAttestation::FutureEpoch { .. },
        )) => AttestationProcessingResult::DeferForkChoiceProcessing(current_slot + Slot::new(1)),
        Err(e) => {
            debug!(log, "Fork choice rejected attestation"; "error" => ?e);
            AttestationProcessingResult::Invalid(format!("{:?}", e))
        }
    }
}
