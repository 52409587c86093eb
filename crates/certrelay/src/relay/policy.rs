//! Relay timing configuration.

use std::time::Duration;

/// How the relay paces subscriptions.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Wall-clock lifetime of one subscription before it is recycled.
    pub max_lifetime: Duration,
    /// Backoff between failed subscriptions.
    pub reconnect: ReconnectPolicy,
    /// A subscription that lasted at least this long resets the backoff.
    pub healthy_run: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_lifetime: Duration::from_secs(600),
            reconnect: ReconnectPolicy::default(),
            healthy_run: Duration::from_secs(60),
        }
    }
}

/// Pause between a faulted subscription and the next `subscribe`.
///
/// The pause grows geometrically with each consecutive fault and is capped;
/// there is no attempt limit. The relay restarts the count from zero after a
/// lifetime expiry or after a subscription that stayed up for `healthy_run`.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Pause after the first fault in a row.
    pub initial_delay: Duration,
    /// Upper bound on any single pause.
    pub max_delay: Duration,
    /// Growth factor per consecutive fault.
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Resubscribe straight away after every fault.
    pub const fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Pause before resubscribing after `attempt` earlier consecutive faults.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = base_ms * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_relay_config() {
        let config = RelayConfig::default();
        assert_eq!(config.max_lifetime, Duration::from_secs(600));
        assert_eq!(config.healthy_run, Duration::from_secs(60));
    }

    #[test]
    fn pause_doubles_until_capped() {
        let policy = ReconnectPolicy::default();
        let pauses: Vec<u64> = (0..8)
            .map(|attempt| policy.delay_for_attempt(attempt).as_secs())
            .collect();
        assert_eq!(pauses, [1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn custom_growth_factor() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 3.0,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4_500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(10));
    }

    #[test]
    fn huge_attempt_stays_capped() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = ReconnectPolicy::immediate();
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(10), Duration::ZERO);
    }
}
