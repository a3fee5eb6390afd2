//! The attestation ingestion/deferral pipeline (components A-D) and the
//! glue that drives them: validated individual/aggregate attestations flow
//! from `attestation_manager::AttestationManager` through
//! `attestation_verification`, into `fork_choice_gateway::ForkChoiceGateway`,
//! parking in one of the three `waiting_areas` when they can't yet be
//! applied. The Combined Chain Data Service and State Regenerator
//! (components E/F) live in the sibling `store` crate; this crate consumes
//! them but does not re-implement them.

pub mod attestation_manager;
pub mod attestation_verification;
pub mod chain_config;
pub mod errors;
pub mod events;
pub mod fork_choice_gateway;
pub mod metrics;
pub mod naive_aggregation_pool;
pub mod observed_attestations;
pub mod observed_attesters;
pub mod signature_verification_service;
pub mod waiting_areas;

pub use attestation_manager::{AttestationManager, SubmissionOutcome};
pub use chain_config::ChainConfig;
pub use errors::BeaconChainError;
pub use events::{EventKind, ServerSentEventHandler};
pub use fork_choice_gateway::{AttestationProcessingResult, ForkChoiceGateway};
pub use naive_aggregation_pool::AggregatingAttestationPool;
pub use signature_verification_service::SignatureVerificationService;
