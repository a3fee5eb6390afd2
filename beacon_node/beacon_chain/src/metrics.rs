pub use lighthouse_metrics::*;
use lazy_static::lazy_static;

lazy_static! {
    // Waiting areas (Component A).
    pub static ref PENDING_POOL_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_chain_pending_pool_size",
        "Number of distinct block roots currently parking attestations in the pending pool"
    );
    pub static ref FUTURE_ITEMS_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_chain_future_items_size",
        "Number of distinct future slots currently parking attestations"
    );
    pub static ref DEFERRED_ATTESTATIONS_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_chain_deferred_attestations_size",
        "Number of distinct slots currently holding a deferred-votes bucket"
    );
    pub static ref AGGREGATING_POOL_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_chain_aggregating_pool_size",
        "Number of distinct AttestationData entries currently held in the aggregating pool"
    );

    // Attestation validators (Component B), dispatched by error variant in
    // the same style as the teacher's `network/src/metrics.rs`
    // `register_attestation_error`.
    pub static ref ATTESTATION_PROCESSING_SUCCESSES: Result<IntCounter> = try_create_int_counter(
        "beacon_chain_attestation_processing_successes_total",
        "Number of individual attestations that passed validation"
    );
    pub static ref ATTESTATION_PROCESSING_ERRORS_PER_TYPE: Result<IntCounterVec> =
        try_create_int_counter_vec(
            "beacon_chain_attestation_processing_errors_per_type_total",
            "Number of attestation validation failures, by error variant",
            &["type"]
        );

    // Fork-Choice Gateway (Component C).
    pub static ref FORK_CHOICE_PROCESS_ATTESTATION_TIME: Result<Histogram> = try_create_histogram(
        "beacon_chain_fork_choice_process_attestation_seconds",
        "Time taken by the gateway to apply a single attestation to fork choice"
    );
    pub static ref FORK_CHOICE_PROCESS_BLOCK_TIME: Result<Histogram> = try_create_histogram(
        "beacon_chain_fork_choice_process_block_seconds",
        "Time taken by the gateway to register a new block with fork choice"
    );

    // Attestation Manager (Component D).
    pub static ref ATTESTATIONS_DEFERRED_DRAINED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "beacon_chain_attestations_deferred_drained_total",
        "Number of deferred attestations re-applied on a slot tick"
    );
    pub static ref ATTESTATIONS_FUTURE_DRAINED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "beacon_chain_attestations_future_drained_total",
        "Number of future attestations applied once their slot arrived"
    );
    pub static ref ATTESTATIONS_PENDING_DRAINED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "beacon_chain_attestations_pending_drained_total",
        "Number of pending attestations resubmitted after their block arrived"
    );
}

pub fn register_attestation_error(error: &crate::attestation_verification::Error) {
    inc_counter_vec(
        &ATTESTATION_PROCESSING_ERRORS_PER_TYPE,
        &[error.as_metric_label()],
    );
}
