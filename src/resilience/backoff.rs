//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Deterministic part of the delay before retry `retry_index` (0 = first retry).
pub fn backoff_floor(retry_index: u32, base_ms: u64) -> Duration {
    let exponential_base = 2u64.saturating_pow(retry_index);
    Duration::from_millis(base_ms.saturating_mul(exponential_base))
}

/// Calculate exponential backoff delay with jitter.
///
/// The result lies in `[base_ms * 2^retry_index, base_ms * 2^retry_index + jitter_ms)`.
pub fn calculate_backoff(retry_index: u32, base_ms: u64, jitter_ms: u64) -> Duration {
    let floor = backoff_floor(retry_index, base_ms);

    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    floor.saturating_add(Duration::from_millis(jitter))
}
