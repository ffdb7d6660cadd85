//! Exponential failure backoff.

/// Backoff after the `failures`-th consecutive failure:
/// `min(cap, base * 2^(failures - 1))`, zero when there are no failures.
pub fn failure_backoff(failures: u32, base_secs: u64, cap_secs: u64) -> u64 {
    if failures == 0 {
        return 0;
    }

    let exponential_base = 2u64.saturating_pow(failures - 1);
    base_secs.saturating_mul(exponential_base).min(cap_secs)
}
