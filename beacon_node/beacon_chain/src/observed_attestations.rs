use std::collections::HashSet;
use types::{Epoch, Hash256};

/// Returned by `ObservedAttestations::observe_item` so callers can tell a
/// brand new attestation from a resubmission of one already known.
#[derive(Debug, PartialEq, Eq)]
pub enum ObserveOutcome {
    New,
    AlreadyKnown,
}

#[derive(Debug, PartialEq)]
pub enum Error {
    /// `observe_item` was called with an epoch older than the oldest epoch still tracked.
    EpochTooLow { epoch: Epoch, lowest_permissible_epoch: Epoch },
}

/// Per-epoch duplicate suppression for attestations, keyed by the
/// attestation's own content hash. Mirrors the teacher's
/// `observed_attestations.rs` (referenced by `attestation_verification.rs`
/// but not present in the retrieved pack) closely enough to fill the same
/// role: reject identical attestations seen twice within the tracked
/// window, while letting old epochs fall off to bound memory.
pub struct ObservedAttestations {
    lowest_permissible_epoch: Epoch,
    items: std::collections::HashMap<Epoch, HashSet<Hash256>>,
    max_epochs_stored: u64,
}

impl ObservedAttestations {
    pub fn new(max_epochs_stored: u64) -> Self {
        Self {
            lowest_permissible_epoch: Epoch::new(0),
            items: std::collections::HashMap::new(),
            max_epochs_stored,
        }
    }

    pub fn observe_item(
        &mut self,
        epoch: Epoch,
        root: Hash256,
    ) -> Result<ObserveOutcome, Error> {
        if epoch < self.lowest_permissible_epoch {
            return Err(Error::EpochTooLow {
                epoch,
                lowest_permissible_epoch: self.lowest_permissible_epoch,
            });
        }

        let set = self.items.entry(epoch).or_insert_with(HashSet::new);
        let is_new = set.insert(root);

        self.prune(epoch);

        if is_new {
            Ok(ObserveOutcome::New)
        } else {
            Ok(ObserveOutcome::AlreadyKnown)
        }
    }

    fn prune(&mut self, latest_epoch: Epoch) {
        if latest_epoch.as_u64() + 1 <= self.max_epochs_stored {
            return;
        }
        let new_lowest = Epoch::new(latest_epoch.as_u64() + 1 - self.max_epochs_stored);
        if new_lowest > self.lowest_permissible_epoch {
            self.lowest_permissible_epoch = new_lowest;
            self.items.retain(|epoch, _| *epoch >= new_lowest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_new() {
        let mut observed = ObservedAttestations::new(4);
        let outcome = observed
            .observe_item(Epoch::new(1), Hash256::repeat_byte(1))
            .unwrap();
        assert_eq!(outcome, ObserveOutcome::New);
    }

    #[test]
    fn repeated_observation_is_already_known() {
        let mut observed = ObservedAttestations::new(4);
        observed
            .observe_item(Epoch::new(1), Hash256::repeat_byte(1))
            .unwrap();
        let outcome = observed
            .observe_item(Epoch::new(1), Hash256::repeat_byte(1))
            .unwrap();
        assert_eq!(outcome, ObserveOutcome::AlreadyKnown);
    }

    #[test]
    fn old_epoch_is_rejected_after_pruning() {
        let mut observed = ObservedAttestations::new(2);
        observed
            .observe_item(Epoch::new(0), Hash256::repeat_byte(1))
            .unwrap();
        observed
            .observe_item(Epoch::new(5), Hash256::repeat_byte(2))
            .unwrap();

        let err = observed
            .observe_item(Epoch::new(0), Hash256::repeat_byte(3))
            .unwrap_err();
        assert_eq!(
            err,
            Error::EpochTooLow {
                epoch: Epoch::new(0),
                lowest_permissible_epoch: Epoch::new(4),
            }
        );
    }
}
