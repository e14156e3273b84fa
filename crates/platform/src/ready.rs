//! Bounded ready-wait policy
//!
//! The controller documents its ready lines as "poll until asserted", with no
//! upper bound. That is kept as the default ([`ReadyPolicy::UNBOUNDED`]) for
//! hardware fidelity, but every wait goes through [`poll_until`] so a test (or
//! a cautious deployment) can cap the number of polls and get a
//! [`PollTimeout`] instead of a hung process.

use embedded_hal::delay::DelayNs;

/// How long to keep polling a ready condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadyPolicy {
    /// Delay between two probes, in microseconds. `0` spins without sleeping.
    pub poll_interval_us: u32,
    /// Maximum number of probes before giving up. `None` waits forever.
    pub max_polls: Option<u32>,
}

impl ReadyPolicy {
    /// Spin forever, no delay between probes (legacy host-ready behaviour).
    pub const UNBOUNDED: Self = Self {
        poll_interval_us: 0,
        max_polls: None,
    };

    /// Give up after `max_polls` probes spaced `poll_interval_us` apart.
    pub const fn bounded(poll_interval_us: u32, max_polls: u32) -> Self {
        Self {
            poll_interval_us,
            max_polls: Some(max_polls),
        }
    }

    /// Upper bound on the total wait in microseconds, if bounded.
    pub fn budget_us(&self) -> Option<u64> {
        self.max_polls
            .map(|n| u64::from(n).saturating_mul(u64::from(self.poll_interval_us)))
    }
}

impl Default for ReadyPolicy {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// The ready condition did not assert within the policy's poll budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollTimeout {
    /// Number of probes performed before giving up.
    pub polls: u32,
}

impl core::fmt::Display for PollTimeout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ready condition not met after {} polls", self.polls)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PollTimeout {}

/// Outcome of a [`poll_until`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollError<E> {
    /// The probe itself failed (e.g. a GPIO or bus read error).
    Probe(E),
    /// The probe never reported ready within budget.
    Timeout(PollTimeout),
}

/// Call `probe` until it returns `Ok(true)`, sleeping `poll_interval_us`
/// between attempts, honouring `policy.max_polls`.
///
/// The first probe runs immediately. Returns the number of probes that
/// reported "not ready" before success, which callers log at trace level.
pub fn poll_until<D, E, F>(
    policy: &ReadyPolicy,
    delay: &mut D,
    mut probe: F,
) -> Result<u32, PollError<E>>
where
    D: DelayNs,
    F: FnMut() -> Result<bool, E>,
{
    let mut polls: u32 = 0;
    loop {
        if probe().map_err(PollError::Probe)? {
            return Ok(polls);
        }
        polls = polls.saturating_add(1);
        if let Some(max) = policy.max_polls {
            if polls >= max {
                return Err(PollError::Timeout(PollTimeout { polls }));
            }
        }
        if policy.poll_interval_us > 0 {
            delay.delay_us(policy.poll_interval_us);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn default_policy_is_unbounded() {
        let policy = ReadyPolicy::default();
        assert_eq!(policy, ReadyPolicy::UNBOUNDED);
        assert_eq!(policy.budget_us(), None);
    }

    #[test]
    fn budget_is_interval_times_polls() {
        assert_eq!(ReadyPolicy::bounded(1_000, 500).budget_us(), Some(500_000));
    }

    #[test]
    fn ready_on_first_probe_reports_zero_retries() {
        let n = poll_until::<_, (), _>(&ReadyPolicy::UNBOUNDED, &mut NoopDelay, || Ok(true))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn counts_not_ready_probes_before_success() {
        let mut remaining = 3;
        let n = poll_until::<_, (), _>(&ReadyPolicy::bounded(10, 10), &mut NoopDelay, || {
            if remaining == 0 {
                Ok(true)
            } else {
                remaining -= 1;
                Ok(false)
            }
        })
        .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn bounded_policy_times_out_on_stuck_probe() {
        let mut probes = 0u32;
        let err = poll_until::<_, (), _>(&ReadyPolicy::bounded(0, 5), &mut NoopDelay, || {
            probes += 1;
            Ok(false)
        })
        .unwrap_err();
        assert_eq!(err, PollError::Timeout(PollTimeout { polls: 5 }));
        assert_eq!(probes, 5, "exactly max_polls probes must be issued");
    }

    #[test]
    fn probe_error_short_circuits() {
        let err = poll_until(&ReadyPolicy::UNBOUNDED, &mut NoopDelay, || Err::<bool, _>("gpio"))
            .unwrap_err();
        assert_eq!(err, PollError::Probe("gpio"));
    }
}
