use serde_derive::{Deserialize, Serialize};

use crate::{Epoch, Hash256};

/// A `(epoch, root)` pair used by fork choice to track justified and finalized
/// checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

impl Checkpoint {
    pub fn new(epoch: Epoch, root: Hash256) -> Self {
        Self { epoch, root }
    }
}
