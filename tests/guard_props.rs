//! Property-based tests for the in-flight guard and the interval clamp.
//!
//! Run with: cargo test --test guard_props

use proptest::prelude::*;
use signsight::session::InflightGuard;
use signsight::TranslatorConfig;

proptest! {
    /// INVARIANT: at most one lease is outstanding, and the slot is engaged
    /// exactly when a live lease is held or a failed cycle suspended it, no
    /// matter how the operation sequence interleaves.
    #[test]
    fn at_most_one_lease(ops in proptest::collection::vec(0u8..5, 1..64)) {
        let guard = InflightGuard::new();
        let mut held = None;
        let mut suspended = false;

        for op in ops {
            match op {
                // try to acquire
                0 => {
                    let lease = guard.try_lease();
                    prop_assert_eq!(lease.is_some(), held.is_none() && !suspended);
                    if let Some(lease) = lease {
                        held = Some(lease);
                    }
                }
                // completion: release if held
                1 => {
                    if let Some(lease) = held.take() {
                        lease.release();
                        prop_assert!(!guard.is_engaged());
                    }
                }
                // failed cycle: persist if held
                2 => {
                    if let Some(lease) = held.take() {
                        lease.persist();
                        suspended = true;
                        prop_assert!(guard.is_engaged());
                        prop_assert!(guard.try_lease().is_none());
                    }
                }
                // retry: force-release (session only does this with no
                // live lease outstanding)
                3 => {
                    if held.is_none() {
                        guard.force_release();
                        suspended = false;
                    }
                }
                // teardown: frees only a suspended hold, never a live one
                _ => {
                    guard.release_suspended();
                    suspended = false;
                }
            }

            prop_assert_eq!(guard.is_engaged(), held.is_some() || suspended);
            prop_assert_eq!(guard.is_suspended(), suspended);
        }
    }

    /// INVARIANT: dropping a lease always disengages the guard.
    #[test]
    fn dropped_lease_never_leaks(rounds in 1usize..32) {
        let guard = InflightGuard::new();
        for _ in 0..rounds {
            let lease = guard.try_lease();
            prop_assert!(lease.is_some());
            drop(lease);
            prop_assert!(!guard.is_engaged());
        }
    }

    /// INVARIANT: clamped intervals always land inside the configured
    /// range, and in-range values pass through unchanged.
    #[test]
    fn interval_clamp_stays_in_range(secs in 0u64..10_000) {
        let config = TranslatorConfig::default().capture;
        let clamped = config.clamp_interval(secs);
        prop_assert!(clamped >= config.min_interval_secs);
        prop_assert!(clamped <= config.max_interval_secs);
        if secs >= config.min_interval_secs && secs <= config.max_interval_secs {
            prop_assert_eq!(clamped, secs);
        }
    }
}
