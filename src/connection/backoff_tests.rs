//! Tests for the reconnect delay schedule

use super::*;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_base_delay_doubles_until_cap() {
    let backoff = Backoff::new(ms(500), ms(3000), 0.0, 8);
    assert_eq!(backoff.base_delay(1), ms(500));
    assert_eq!(backoff.base_delay(2), ms(1000));
    assert_eq!(backoff.base_delay(3), ms(2000));
    assert_eq!(backoff.base_delay(4), ms(3000));
    assert_eq!(backoff.base_delay(50), ms(3000));
}

#[test]
fn test_zero_failures_uses_initial() {
    let backoff = Backoff::new(ms(200), ms(1000), 0.0, 3);
    assert_eq!(backoff.base_delay(0), ms(200));
}

#[test]
fn test_no_jitter_is_exact() {
    let backoff = Backoff::new(ms(100), ms(1000), 0.0, 3);
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(backoff.delay(2, &mut rng), ms(200));
}

#[test]
fn test_degraded_threshold() {
    let backoff = Backoff::new(ms(100), ms(1000), 0.0, 3);
    assert!(!backoff.is_degraded(2));
    assert!(backoff.is_degraded(3));
    assert!(backoff.is_degraded(4));
}

#[test]
fn test_max_below_initial_is_raised() {
    let backoff = Backoff::new(ms(500), ms(100), 0.0, 3);
    assert_eq!(backoff.base_delay(5), ms(500));
}

#[test]
fn test_default_matches_config_defaults() {
    let backoff = Backoff::default();
    assert_eq!(backoff.base_delay(1), ms(500));
    assert_eq!(backoff.max_retries(), 8);
    assert_eq!(backoff.stable_after(), ms(5000));
}

#[test]
fn test_stable_after_from_config() {
    let config = ReconnectConfig {
        stable_after_ms: 250,
        ..ReconnectConfig::default()
    };
    assert_eq!(Backoff::from_config(&config).stable_after(), ms(250));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Jittered delay never exceeds the base delay and never drops below
    // the un-shaved share of it.
    #[test]
    fn prop_jitter_stays_in_band(
        failures in 1u32..40,
        jitter in 0.0f64..=1.0,
        seed in any::<u64>()
    ) {
        let backoff = Backoff::new(ms(100), ms(30_000), jitter, 8);
        let mut rng = StdRng::seed_from_u64(seed);
        let base = backoff.base_delay(failures);
        let delay = backoff.delay(failures, &mut rng);

        prop_assert!(delay <= base);
        prop_assert!(delay >= base.mul_f64(1.0 - jitter).saturating_sub(ms(1)));
    }
}
