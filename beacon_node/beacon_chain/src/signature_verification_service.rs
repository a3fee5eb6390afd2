//! The long-running batching service Component B's validators defer BLS
//! verification to. Its lifecycle (start/stop) is owned by the Attestation
//! Manager, per spec §4.B/§5: coalesces pending verifications by a
//! wall-clock deadline or a batch-size threshold, whichever fires first —
//! a standard coalescing-queue pattern, grounded in the teacher's
//! `task_executor`-driven background-service idiom (see
//! `common/task_executor/src/lib.rs`'s `TaskExecutor::spawn`).

use slog::{debug, Logger};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use types::IndexedAttestation;

/// A single verification job: the attestation plus a channel to report
/// whether its signature was valid. Signature math itself is delegated to
/// `verify_fn`, standing in for the teacher's `bls::verify_signature_sets`.
struct Job {
    attestation: IndexedAttestation,
    reply: oneshot::Sender<bool>,
}

#[derive(Clone)]
pub struct SignatureVerificationService {
    tx: mpsc::Sender<Job>,
}

impl SignatureVerificationService {
    /// `verify_fn` is called once per coalesced batch; a real
    /// implementation would hand the batch to `bls::verify_signature_sets`.
    /// Here it's supplied by the caller so this module stays independent of
    /// any concrete signature scheme.
    pub fn spawn<F>(
        batch_deadline: Duration,
        batch_size: usize,
        verify_fn: F,
        log: Logger,
        executor: &task_executor::TaskExecutor,
    ) -> Self
    where
        F: Fn(&[IndexedAttestation]) -> Vec<bool> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Job>(1024);

        executor.spawn(
            async move {
                let mut batch: Vec<Job> = Vec::with_capacity(batch_size);
                let mut ticker = interval(batch_deadline);

                loop {
                    tokio::select! {
                        job = rx.recv() => {
                            match job {
                                Some(job) => {
                                    batch.push(job);
                                    if batch.len() >= batch_size {
                                        flush(&mut batch, &verify_fn);
                                    }
                                }
                                None => {
                                    flush(&mut batch, &verify_fn);
                                    debug!(log, "Signature verification service channel closed, exiting");
                                    return;
                                }
                            }
                        }
                        _ = ticker.tick() => {
                            flush(&mut batch, &verify_fn);
                        }
                    }
                }
            },
            "signature_verification_service",
        );

        Self { tx }
    }

    pub async fn verify(&self, attestation: IndexedAttestation) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(Job { attestation, reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }
}

fn flush<F>(batch: &mut Vec<Job>, verify_fn: &F)
where
    F: Fn(&[IndexedAttestation]) -> Vec<bool>,
{
    if batch.is_empty() {
        return;
    }
    let attestations: Vec<IndexedAttestation> = batch.iter().map(|j| j.attestation.clone()).collect();
    let results = verify_fn(&attestations);

    for (job, result) in batch.drain(..).zip(results.into_iter()) {
        let _ = job.reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use types::{AttestationData, Checkpoint, Epoch, Hash256, Slot};

    fn indexed(slot: u64) -> IndexedAttestation {
        IndexedAttestation {
            attesting_indices: vec![0],
            data: AttestationData {
                slot: Slot::new(slot),
                index: 0,
                beacon_block_root: Hash256::repeat_byte(7),
                source: Checkpoint::new(Epoch::new(0), Hash256::zero()),
                target: Checkpoint::new(Epoch::new(0), Hash256::zero()),
            },
            signature: types::AggregateSignature::empty(),
        }
    }

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn flushes_on_batch_size() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let service = SignatureVerificationService::spawn(
            Duration::from_secs(60),
            2,
            move |batch: &[IndexedAttestation]| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                vec![true; batch.len()]
            },
            test_logger(),
            &executor,
        );

        executor.handle().block_on(async {
            let (a, b) = tokio::join!(service.verify(indexed(1)), service.verify(indexed(2)));
            assert!(a);
            assert!(b);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn flushes_on_deadline_with_partial_batch() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();

        let service = SignatureVerificationService::spawn(
            Duration::from_millis(20),
            64,
            |batch: &[IndexedAttestation]| vec![true; batch.len()],
            test_logger(),
            &executor,
        );

        let result = executor.handle().block_on(service.verify(indexed(1)));
        assert!(result);
    }

    #[test]
    fn propagates_false_verdict() {
        let (_runtime, executor, _signal) = task_executor::test_runtime();

        let service = SignatureVerificationService::spawn(
            Duration::from_secs(60),
            1,
            |batch: &[IndexedAttestation]| vec![false; batch.len()],
            test_logger(),
            &executor,
        );

        let result = executor.handle().block_on(service.verify(indexed(1)));
        assert!(!result);
    }
}
