//! A thin server-sent-events style fan-out, mirroring the teacher's
//! `events.rs` `ServerSentEventHandler` almost exactly: one
//! `tokio::sync::broadcast` channel per topic, `register` silently
//! trace-logging "no receivers" rather than treating it as an error.
//! Distinct from `attestation_manager`'s internal subscriber sets — this one
//! is meant for external consumers (an HTTP API, were one in scope here).

use serde_derive::{Deserialize, Serialize};
use slog::{trace, Logger};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, SendError, Sender};
use types::{Checkpoint, Hash256, IndexedAttestation};

const DEFAULT_CHANNEL_CAPACITY: usize = 10;

pub struct ServerSentEventHandler {
    attestation_tx: Sender<EventKind>,
    block_tx: Sender<EventKind>,
    finalized_tx: Sender<EventKind>,
    head_tx: Sender<EventKind>,
    log: Logger,
}

impl ServerSentEventHandler {
    pub fn new(log: Logger) -> Self {
        Self::new_with_capacity(log, DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn new_with_capacity(log: Logger, capacity: usize) -> Self {
        let (attestation_tx, _) = broadcast::channel(capacity);
        let (block_tx, _) = broadcast::channel(capacity);
        let (finalized_tx, _) = broadcast::channel(capacity);
        let (head_tx, _) = broadcast::channel(capacity);

        Self {
            attestation_tx,
            block_tx,
            finalized_tx,
            head_tx,
            log,
        }
    }

    pub fn register(&self, kind: EventKind) {
        let result = match kind {
            EventKind::Attestation(ref a) => self
                .attestation_tx
                .send(EventKind::Attestation(a.clone()))
                .map(|count| {
                    trace!(self.log, "Registering server-sent attestation event"; "receiver_count" => count)
                }),
            EventKind::Block(root) => self
                .block_tx
                .send(EventKind::Block(root))
                .map(|count| trace!(self.log, "Registering server-sent block event"; "receiver_count" => count)),
            EventKind::FinalizedCheckpoint(checkpoint) => self
                .finalized_tx
                .send(EventKind::FinalizedCheckpoint(checkpoint))
                .map(|count| {
                    trace!(self.log, "Registering server-sent finalized checkpoint event"; "receiver_count" => count)
                }),
            EventKind::Head(root) => self
                .head_tx
                .send(EventKind::Head(root))
                .map(|count| trace!(self.log, "Registering server-sent head event"; "receiver_count" => count)),
        };
        if let Err(SendError(event)) = result {
            trace!(self.log, "No receivers registered to listen for event"; "event" => ?event);
        }
    }

    pub fn subscribe_attestation(&self) -> Receiver<EventKind> {
        self.attestation_tx.subscribe()
    }

    pub fn subscribe_block(&self) -> Receiver<EventKind> {
        self.block_tx.subscribe()
    }

    pub fn subscribe_finalized(&self) -> Receiver<EventKind> {
        self.finalized_tx.subscribe()
    }

    pub fn subscribe_head(&self) -> Receiver<EventKind> {
        self.head_tx.subscribe()
    }

    pub fn attestation_receiver_count(&self) -> usize {
        self.attestation_tx.receiver_count()
    }

    pub fn block_receiver_count(&self) -> usize {
        self.block_tx.receiver_count()
    }

    pub fn finalized_receiver_count(&self) -> usize {
        self.finalized_tx.receiver_count()
    }

    pub fn head_receiver_count(&self) -> usize {
        self.head_tx.receiver_count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Attestation(Box<IndexedAttestation>),
    Block(Hash256),
    FinalizedCheckpoint(Checkpoint),
    Head(Hash256),
}
