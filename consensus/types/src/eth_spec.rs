use serde_derive::{Deserialize, Serialize};
use std::fmt::Debug;

/// Network-preset constants needed by the pipeline and chain-data layer.
///
/// The teacher's `EthSpec` trait parameterises dozens of SSZ list lengths via
/// `typenum`; that machinery exists to make fixed-size SSZ containers
/// type-check at compile time and has no bearing on attestation ingestion or
/// chain data access, so it is dropped here in favour of the handful of
/// runtime constants this pipeline actually reads.
pub trait EthSpec: 'static + Default + Sync + Send + Clone + Debug + PartialEq + Eq {
    fn slots_per_epoch() -> u64;

    /// Mirrors the teacher's `chain_config.rs` import-skip-slots guard; the
    /// regenerator uses this as a sane per-spec default before `ChainConfig`
    /// overrides it.
    fn default_import_max_skip_slots() -> u64 {
        u64::max_value()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainnetEthSpec;

impl EthSpec for MainnetEthSpec {
    fn slots_per_epoch() -> u64 {
        32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalEthSpec;

impl EthSpec for MinimalEthSpec {
    fn slots_per_epoch() -> u64 {
        8
    }
}
