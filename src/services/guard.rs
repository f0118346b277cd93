//! Mutation pacing and payload caps
//!
//! Reloads and updates each go through their own single-token bucket, so
//! admission is a minimum interval between accepted operations rather than
//! a burst allowance. Rejections are immediate; nothing is queued.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::debug;

use crate::config::GuardConfig;
use crate::errors::{BridgeError, Result};

pub struct MutationGuard {
    reload: Option<DefaultDirectRateLimiter>,
    update: Option<DefaultDirectRateLimiter>,
    max_payload_bytes: usize,
}

/// Limiter admitting one operation per `period`; `None` when the period is zero.
fn pacing(period: Duration) -> Option<DefaultDirectRateLimiter> {
    Quota::with_period(period)
        .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)))
}

fn admit(limiter: &Option<DefaultDirectRateLimiter>, operation: &str) -> Result<()> {
    let Some(limiter) = limiter else {
        return Ok(());
    };
    limiter.check().map_err(|not_until| {
        let wait = not_until.wait_time_from(DefaultClock::default().now());
        debug!("{} rejected, next slot in {:?}", operation, wait);
        BridgeError::rate_limited(format!(
            "{} rate limited, retry in {}ms",
            operation,
            wait.as_millis().max(1)
        ))
    })
}

impl MutationGuard {
    pub fn new(reload_interval: Duration, update_interval: Duration, max_payload_bytes: usize) -> Self {
        Self {
            reload: pacing(reload_interval),
            update: pacing(update_interval),
            max_payload_bytes,
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(
            config.reload_interval(),
            config.update_interval(),
            config.max_payload_bytes,
        )
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Take the reload slot or fail with `RateLimited`.
    pub fn admit_reload(&self) -> Result<()> {
        admit(&self.reload, "reload")
    }

    /// Take the (system-wide) update slot or fail with `RateLimited`.
    pub fn admit_update(&self) -> Result<()> {
        admit(&self.update, "update")
    }

    pub fn check_payload(&self, len: usize) -> Result<()> {
        if len > self.max_payload_bytes {
            return Err(BridgeError::payload_too_large(format!(
                "request body of {} bytes exceeds the {} byte limit",
                len, self.max_payload_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_reload_within_interval_rejected() {
        let guard = MutationGuard::new(Duration::from_secs(20), Duration::from_secs(1), 10);
        assert!(guard.admit_reload().is_ok());
        assert!(matches!(
            guard.admit_reload(),
            Err(BridgeError::RateLimited(_))
        ));
    }

    #[test]
    fn test_reload_and_update_are_independent() {
        let guard = MutationGuard::new(Duration::from_secs(20), Duration::from_secs(20), 10);
        assert!(guard.admit_reload().is_ok());
        assert!(guard.admit_update().is_ok());
        assert!(guard.admit_update().is_err());
    }

    #[test]
    fn test_zero_interval_disables_pacing() {
        let guard = MutationGuard::new(Duration::ZERO, Duration::ZERO, 10);
        for _ in 0..5 {
            assert!(guard.admit_reload().is_ok());
            assert!(guard.admit_update().is_ok());
        }
    }

    #[test]
    fn test_admitted_again_after_interval() {
        let guard = MutationGuard::new(Duration::from_secs(20), Duration::from_millis(50), 10);
        assert!(guard.admit_update().is_ok());
        assert!(guard.admit_update().is_err());
        std::thread::sleep(Duration::from_millis(80));
        assert!(guard.admit_update().is_ok());
    }

    #[test]
    fn test_payload_cap() {
        let guard = MutationGuard::new(Duration::ZERO, Duration::ZERO, 51200);
        assert!(guard.check_payload(51200).is_ok());
        assert!(matches!(
            guard.check_payload(51201),
            Err(BridgeError::PayloadTooLarge(_))
        ));
    }
}
