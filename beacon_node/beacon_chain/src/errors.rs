use store::Error as StoreError;

/// Aggregates failures from every collaborator the attestation pipeline and
/// chain data service call into, mirroring the teacher's pervasive
/// `impl From<XError> for BeaconChainError` pattern (see
/// `fork_choice.rs`'s `Error<T>` and `attestation_verification.rs`'s
/// `Error::BeaconChainError` wrapping).
#[derive(Debug, PartialEq)]
pub enum BeaconChainError {
    StoreError(StoreError),
    ForkChoiceError(String),
    AttestationValidationError(crate::attestation_verification::Error),
    /// The chain has not yet observed a genesis block; reads return empty, writes are refused.
    PreGenesis,
    /// Fork choice has not yet been initialized with a genesis block.
    PreForkChoice,
}

impl From<StoreError> for BeaconChainError {
    fn from(e: StoreError) -> Self {
        BeaconChainError::StoreError(e)
    }
}

impl From<crate::attestation_verification::Error> for BeaconChainError {
    fn from(e: crate::attestation_verification::Error) -> Self {
        BeaconChainError::AttestationValidationError(e)
    }
}

impl std::fmt::Display for BeaconChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for BeaconChainError {}
