use std::collections::HashMap;
use types::{Epoch, ValidatorIndex};

#[derive(Debug, PartialEq)]
pub enum Error {
    EpochTooLow {
        epoch: Epoch,
        lowest_permissible_epoch: Epoch,
    },
    ValidatorIndexTooHigh(ValidatorIndex),
}

/// Tracks, per epoch, which validator indices have already had an
/// attestation observed from them — mirroring the teacher's
/// `observed_attesters.rs` (named from `attestation_verification.rs` but
/// absent from the retrieved pack). Used to reject a second unaggregated
/// attestation or aggregation from a validator within the same epoch.
pub struct ObservedAttesters {
    lowest_permissible_epoch: Epoch,
    seen: HashMap<Epoch, std::collections::HashSet<ValidatorIndex>>,
    max_epochs_stored: u64,
}

impl ObservedAttesters {
    pub fn new(max_epochs_stored: u64) -> Self {
        Self {
            lowest_permissible_epoch: Epoch::new(0),
            seen: HashMap::new(),
            max_epochs_stored,
        }
    }

    /// Returns `true` if `validator_index` had already been observed at `epoch`.
    pub fn observe_validator(
        &mut self,
        epoch: Epoch,
        validator_index: ValidatorIndex,
    ) -> Result<bool, Error> {
        if epoch < self.lowest_permissible_epoch {
            return Err(Error::EpochTooLow {
                epoch,
                lowest_permissible_epoch: self.lowest_permissible_epoch,
            });
        }

        let set = self.seen.entry(epoch).or_insert_with(Default::default);
        let already_known = !set.insert(validator_index);

        if epoch.as_u64() + 1 > self.max_epochs_stored {
            let new_lowest = Epoch::new(epoch.as_u64() + 1 - self.max_epochs_stored);
            if new_lowest > self.lowest_permissible_epoch {
                self.lowest_permissible_epoch = new_lowest;
                self.seen.retain(|e, _| *e >= new_lowest);
            }
        }

        Ok(already_known)
    }
}
