//! Adaptive polling-delay computation.
//!
//! A client polling a job is told how long to wait before asking again.
//! The delay tracks the estimated remaining time, extrapolated linearly
//! from elapsed time and progress, and is clamped to the job's configured
//! `[base, max]` window. With no progress information yet the base delay
//! is used.

use serde::{Deserialize, Serialize};

/// Default delay before the first status poll.
pub const DEFAULT_BASE_POLLING_DELAY_MS: u64 = 1_000;

/// Default ceiling for the polling delay.
pub const DEFAULT_MAX_POLLING_DELAY_MS: u64 = 60_000;

/// Polling window for one job, fixed at job creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl PollingConfig {
    /// Build a window, raising `max` to `base` if it is smaller.
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_POLLING_DELAY_MS, DEFAULT_MAX_POLLING_DELAY_MS)
    }
}

/// Estimated milliseconds remaining, or `None` without progress.
///
/// `elapsed * (100 - p) / p` using truncating integer arithmetic.
pub fn estimated_remaining_ms(elapsed_ms: u64, progress_percent: u8) -> Option<u64> {
    let p = u64::from(progress_percent.min(100));
    if p == 0 {
        return None;
    }
    Some(elapsed_ms.saturating_mul(100 - p) / p)
}

/// Estimated total run time, or `None` without progress.
pub fn estimated_total_ms(elapsed_ms: u64, progress_percent: u8) -> Option<u64> {
    estimated_remaining_ms(elapsed_ms, progress_percent).map(|r| r.saturating_add(elapsed_ms))
}

/// Delay a client should wait before polling again.
///
/// Always within `[config.base_delay_ms, config.max_delay_ms]`; exactly the
/// base delay when progress is 0.
pub fn next_poll_delay_ms(elapsed_ms: u64, progress_percent: u8, config: PollingConfig) -> u64 {
    let max = config.max_delay_ms.max(config.base_delay_ms);
    match estimated_remaining_ms(elapsed_ms, progress_percent) {
        None => config.base_delay_ms,
        Some(remaining) => remaining.clamp(config.base_delay_ms, max),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: PollingConfig = PollingConfig {
        base_delay_ms: 500,
        max_delay_ms: 10_000,
    };

    #[test]
    fn zero_progress_uses_base_delay() {
        assert_eq!(next_poll_delay_ms(0, 0, WINDOW), 500);
        assert_eq!(next_poll_delay_ms(1_000_000, 0, WINDOW), 500);
    }

    #[test]
    fn early_polls_are_bounded_by_base() {
        // 100ms elapsed at 50% → 100ms remaining, below base.
        assert_eq!(next_poll_delay_ms(100, 50, WINDOW), 500);
    }

    #[test]
    fn tracks_remaining_time_inside_window() {
        // 3s elapsed at 25% → 9s remaining.
        assert_eq!(next_poll_delay_ms(3_000, 25, WINDOW), 9_000);
    }

    #[test]
    fn long_jobs_back_off_to_the_cap() {
        assert_eq!(next_poll_delay_ms(60_000, 10, WINDOW), 10_000);
    }

    #[test]
    fn finished_job_uses_base_delay() {
        assert_eq!(next_poll_delay_ms(60_000, 100, WINDOW), 500);
    }

    #[test]
    fn delay_always_within_bounds() {
        for elapsed in [0u64, 1, 99, 1_000, 77_777, u64::MAX] {
            for p in 0..=100u8 {
                let d = next_poll_delay_ms(elapsed, p, WINDOW);
                assert!(
                    (WINDOW.base_delay_ms..=WINDOW.max_delay_ms).contains(&d),
                    "elapsed={elapsed} p={p} gave {d}"
                );
            }
        }
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(estimated_remaining_ms(10, 3), Some(323));
        assert_eq!(estimated_total_ms(10, 3), Some(333));
        assert_eq!(estimated_remaining_ms(10, 0), None);
    }

    #[test]
    fn inverted_window_is_normalised() {
        let cfg = PollingConfig::new(2_000, 100);
        assert_eq!(cfg.max_delay_ms, 2_000);
        assert_eq!(next_poll_delay_ms(5_000, 10, cfg), 2_000);
    }
}
