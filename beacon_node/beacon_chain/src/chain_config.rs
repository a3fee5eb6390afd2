use serde_derive::{Deserialize, Serialize};
use std::time::Duration;

/// There is a 693 block skip in the current canonical Medalla chain, we use 700 to be safe.
pub const DEFAULT_IMPORT_BLOCK_MAX_SKIP_SLOTS: u64 = 700;

/// Default bound on each of the three waiting areas (Pending, Future, Deferred).
pub const DEFAULT_WAITING_AREA_CAPACITY: usize = 4_096;

/// Default coalescing window for the Signature Verification Service.
pub const DEFAULT_SIGNATURE_BATCH_DEADLINE: Duration = Duration::from_millis(50);

/// Default signature batch size threshold, whichever of the two fires first.
pub const DEFAULT_SIGNATURE_BATCH_SIZE: usize = 64;

/// Epochs of history `ObservedAttestations`/`ObservedAttesters` retain before
/// the oldest epoch is pruned.
pub const DEFAULT_OBSERVED_EPOCHS_STORED: u64 = 4;

#[derive(Debug, PartialEq, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Maximum number of slots to skip when importing a consensus message (e.g., block,
    /// attestation, etc).
    ///
    /// If `None`, there is no limit.
    pub import_max_skip_slots: Option<u64>,
    /// Bound on each waiting area (Pending, Future, Deferred); overflow evicts the oldest bucket.
    pub waiting_area_capacity: usize,
    /// How long the Signature Verification Service waits to coalesce a batch.
    #[serde(with = "duration_as_millis")]
    pub signature_batch_deadline: Duration,
    pub signature_batch_size: usize,
    pub observed_epochs_stored: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            import_max_skip_slots: Some(DEFAULT_IMPORT_BLOCK_MAX_SKIP_SLOTS),
            waiting_area_capacity: DEFAULT_WAITING_AREA_CAPACITY,
            signature_batch_deadline: DEFAULT_SIGNATURE_BATCH_DEADLINE,
            signature_batch_size: DEFAULT_SIGNATURE_BATCH_SIZE,
            observed_epochs_stored: DEFAULT_OBSERVED_EPOCHS_STORED,
        }
    }
}

mod duration_as_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
