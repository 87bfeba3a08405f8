// SPDX-FileCopyrightText: 2026 Marlin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff for reconnect attempts.

use std::time::Duration;

/// Reconnect backoff policy: `delay = min(base * 2^attempt, cap)`, with a
/// hard bound on the number of attempts.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Delay before the given zero-indexed attempt.
    ///
    /// The doubling saturates at the cap, so large attempt numbers cannot
    /// overflow.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay_ms = (self.base.as_millis() as u64)
            .checked_mul(factor)
            .unwrap_or(u64::MAX);
        Duration::from_millis(delay_ms).min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(1000),
            cap: Duration::from_millis(60_000),
            max_attempts: 5,
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let p = policy();
        assert_eq!(p.delay(0), Duration::from_millis(1000));
        assert_eq!(p.delay(1), Duration::from_millis(2000));
        assert_eq!(p.delay(2), Duration::from_millis(4000));
        assert_eq!(p.delay(3), Duration::from_millis(8000));
    }

    #[test]
    fn delay_is_capped() {
        let p = policy();
        // 1000 * 2^6 = 64000 > 60000
        assert_eq!(p.delay(6), Duration::from_millis(60_000));
        assert_eq!(p.delay(20), Duration::from_millis(60_000));
    }

    #[test]
    fn extreme_attempts_do_not_overflow() {
        let p = policy();
        assert_eq!(p.delay(u32::MAX), p.cap);
        assert_eq!(p.delay(63), p.cap);
        assert_eq!(p.delay(64), p.cap);
    }

    #[test]
    fn formula_matches_spec_for_every_attempt_under_cap() {
        let p = policy();
        for attempt in 0..6u32 {
            let expected = (1000u64 * 2u64.pow(attempt)).min(60_000);
            assert_eq!(p.delay(attempt), Duration::from_millis(expected));
        }
    }
}
