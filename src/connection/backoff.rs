//! Reconnect delay schedule
//!
//! Exponential growth from an initial delay up to a cap, with part of each
//! delay shaved off at random so many clients don't retry in lockstep.
//!
//! A connection that opens and drops again before it proves itself counts
//! as a failure too, so a server that accepts and hangs up straight away
//! is retried on the same growing schedule.

use std::time::Duration;

use rand::Rng;

use crate::config::ReconnectConfig;

const DEFAULT_STABLE_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: f64,
    max_retries: u32,
    /// Open time after which a connection resets the failure count
    stable_after: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: f64, max_retries: u32) -> Self {
        Self {
            initial,
            max: max.max(initial),
            jitter: jitter.clamp(0.0, 1.0),
            max_retries,
            stable_after: DEFAULT_STABLE_AFTER,
        }
    }

    pub fn with_stable_after(mut self, stable_after: Duration) -> Self {
        self.stable_after = stable_after;
        self
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.jitter,
            config.max_retries,
        )
        .with_stable_after(Duration::from_millis(config.stable_after_ms))
    }

    /// Delay before retry number `failures` (1-based), without jitter
    pub fn base_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Delay before retry number `failures`, jitter applied
    pub fn delay<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(failures);
        if self.jitter == 0.0 {
            return base;
        }
        let shave: f64 = rng.gen_range(0.0..1.0) * self.jitter;
        base.mul_f64(1.0 - shave).min(base)
    }

    /// Whether `failures` consecutive failures count as degraded
    pub fn is_degraded(&self, failures: u32) -> bool {
        failures >= self.max_retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn stable_after(&self) -> Duration {
        self.stable_after
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod backoff_tests;
