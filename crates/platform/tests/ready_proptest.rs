//! Property-based tests for the bounded ready-wait.
//! Verifies invariants hold for ALL policies and probe sequences, not just
//! fixed examples.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use platform::{poll_until, PollError, PollTimeout, ReadyPolicy};

proptest::proptest! {
    /// A probe that becomes ready after `busy` polls succeeds iff the budget
    /// allows more than `busy` probes, and reports exactly `busy` retries.
    #[test]
    fn bounded_wait_succeeds_iff_budget_exceeds_busy_polls(busy in 0u32..200, max in 1u32..200) {
        let mut left = busy;
        let result = poll_until::<_, (), _>(&ReadyPolicy::bounded(0, max), &mut NoopDelay, || {
            if left == 0 {
                Ok(true)
            } else {
                left -= 1;
                Ok(false)
            }
        });
        if busy < max {
            assert_eq!(result, Ok(busy));
        } else {
            assert_eq!(result, Err(PollError::Timeout(PollTimeout { polls: max })));
        }
    }

    /// The probe is never called more than `max_polls` times.
    #[test]
    fn never_probes_past_budget(max in 1u32..500) {
        let mut calls = 0u32;
        let _ = poll_until::<_, (), _>(&ReadyPolicy::bounded(0, max), &mut NoopDelay, || {
            calls += 1;
            Ok(false)
        });
        assert_eq!(calls, max);
    }

    /// Budget never overflows, whatever the interval and poll count.
    #[test]
    fn budget_saturates(interval in proptest::num::u32::ANY, max in proptest::num::u32::ANY) {
        let budget = ReadyPolicy::bounded(interval, max).budget_us().unwrap();
        assert_eq!(budget, u64::from(interval) * u64::from(max));
    }
}

#[test]
fn probe_error_stops_the_wait_immediately() {
    let mut calls = 0;
    let result = poll_until(&ReadyPolicy::UNBOUNDED, &mut NoopDelay, || {
        calls += 1;
        if calls == 3 {
            Err("gpio")
        } else {
            Ok(false)
        }
    });
    assert_eq!(result, Err(PollError::Probe("gpio")));
    assert_eq!(calls, 3);
}
