use lazy_static::lazy_static;
use lighthouse_metrics::*;

lazy_static! {
    pub static ref REGEN_SLOTS_ADVANCED_TOTAL: Result<IntCounter> = try_create_int_counter(
        "store_regen_slots_advanced_total",
        "Number of empty slots processed by the state regenerator"
    );
    pub static ref CHAIN_DATA_CACHE_HIT_TOTAL: Result<IntCounter> = try_create_int_counter(
        "store_chain_data_cache_hit_total",
        "Number of RecentChainData queries served directly from the state cache"
    );
    pub static ref CHAIN_DATA_CACHE_MISS_TOTAL: Result<IntCounter> = try_create_int_counter(
        "store_chain_data_cache_miss_total",
        "Number of RecentChainData queries that fell through to regeneration"
    );
    pub static ref REGEN_DURATION: Result<Histogram> = try_create_histogram(
        "store_regen_duration_seconds",
        "Time taken to regenerate a requested state"
    );
}
