//! Liveness clocks shared between the relay loop and the health surface.
//!
//! Two wall-clock stamps are kept as Unix milliseconds in atomics: when the
//! relay last read an upstream event and when it last handed a record to the
//! publisher. Zero means "never". The relay task is the only writer; the HTTP
//! task only reads, so a relaxed single-word atomic is enough (no torn reads).

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Name of the check on the read clock.
pub const READ_CHECK: &str = "read";
/// Name of the check on the send clock.
pub const SENT_CHECK: &str = "sent";

/// The `last_read` / `last_sent` pair.
#[derive(Debug, Default)]
pub struct Liveness {
    last_read: AtomicI64,
    last_sent: AtomicI64,
}

impl Liveness {
    pub const fn new() -> Self {
        Self {
            last_read: AtomicI64::new(0),
            last_sent: AtomicI64::new(0),
        }
    }

    /// Record that an upstream event was read now.
    pub fn mark_read(&self) {
        self.mark_read_at(SystemTime::now());
    }

    /// Record that a record was handed to the publisher now.
    pub fn mark_sent(&self) {
        self.mark_sent_at(SystemTime::now());
    }

    /// Advance `last_read` to `at`. Never moves the clock backwards.
    pub fn mark_read_at(&self, at: SystemTime) {
        self.last_read.fetch_max(to_millis(at), Ordering::Relaxed);
    }

    /// Advance `last_sent` to `at`, clamped to at least `last_read` so a send
    /// is never stamped before the read that produced it.
    pub fn mark_sent_at(&self, at: SystemTime) {
        let floor = self.last_read.load(Ordering::Relaxed);
        self.last_sent
            .fetch_max(to_millis(at).max(floor), Ordering::Relaxed);
    }

    pub fn last_read(&self) -> Option<SystemTime> {
        from_millis(self.last_read.load(Ordering::Relaxed))
    }

    pub fn last_sent(&self) -> Option<SystemTime> {
        from_millis(self.last_sent.load(Ordering::Relaxed))
    }

    /// Evaluate both checks against `now`.
    ///
    /// A clock passes when `now - stamp < max_staleness`. A clock that was
    /// never set fails.
    pub fn check(&self, now: SystemTime, max_staleness: Duration) -> HealthReport {
        HealthReport {
            checks: vec![
                CheckResult::evaluate(READ_CHECK, "read", self.last_read(), now, max_staleness),
                CheckResult::evaluate(SENT_CHECK, "send", self.last_sent(), now, max_staleness),
            ],
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    /// `None` when the check passed.
    pub error: Option<String>,
}

impl CheckResult {
    fn evaluate(
        name: &'static str,
        noun: &str,
        stamp: Option<SystemTime>,
        now: SystemTime,
        max_staleness: Duration,
    ) -> Self {
        let error = match stamp {
            None => Some(format!("No {noun} has been recorded yet")),
            Some(at) => {
                // A stamp in the future (clock stepped back) counts as fresh.
                let age = now.duration_since(at).unwrap_or_default();
                (age >= max_staleness).then(|| {
                    format!(
                        "Last {noun} was at {}, {}s ago (limit {}s)",
                        display_unix(at),
                        age.as_secs(),
                        max_staleness.as_secs()
                    )
                })
            }
        };
        Self { name, error }
    }

    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of evaluating every liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub checks: Vec<CheckResult>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(CheckResult::is_ok)
    }

    /// `(name, message)` for every failing check.
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.checks
            .iter()
            .filter_map(|c| c.error.as_deref().map(|e| (c.name, e)))
    }
}

fn to_millis(at: SystemTime) -> i64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

fn from_millis(ms: i64) -> Option<SystemTime> {
    let ms = u64::try_from(ms).ok().filter(|&ms| ms > 0)?;
    UNIX_EPOCH.checked_add(Duration::from_millis(ms))
}

fn display_unix(at: SystemTime) -> String {
    let d = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("unix {}.{:03}", d.as_secs(), d.subsec_millis())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn fresh_state_is_unhealthy() {
        let live = Liveness::new();
        assert!(live.last_read().is_none());
        assert!(live.last_sent().is_none());

        let report = live.check(at(1_700_000_000), TEN_MINUTES);
        assert!(!report.is_healthy());
        let names: Vec<_> = report.failures().map(|(n, _)| n).collect();
        assert_eq!(names, vec![READ_CHECK, SENT_CHECK]);
    }

    #[test]
    fn recent_read_and_send_are_healthy() {
        let live = Liveness::new();
        live.mark_read_at(at(1_000));
        live.mark_sent_at(at(1_001));
        assert!(live.check(at(1_500), TEN_MINUTES).is_healthy());
    }

    #[test]
    fn staleness_boundary_is_exclusive() {
        let live = Liveness::new();
        live.mark_read_at(at(1_000));
        live.mark_sent_at(at(1_000));
        assert!(live.check(at(1_599), TEN_MINUTES).is_healthy());
        assert!(!live.check(at(1_600), TEN_MINUTES).is_healthy());
    }

    #[test]
    fn stale_send_only_fails_sent_check() {
        let live = Liveness::new();
        live.mark_read_at(at(1_000));
        live.mark_sent_at(at(1_000));
        live.mark_read_at(at(2_000));

        let report = live.check(at(2_100), TEN_MINUTES);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, SENT_CHECK);
    }

    #[test]
    fn failure_message_formats_its_own_clock() {
        let live = Liveness::new();
        live.mark_read_at(at(5_000));
        live.mark_sent_at(at(5_000));
        live.mark_read_at(at(9_000));

        let report = live.check(at(9_100), TEN_MINUTES);
        let (_, msg) = report.failures().next().unwrap();
        assert!(msg.contains("unix 5000.000"), "message: {msg}");
        assert!(msg.starts_with("Last send"), "message: {msg}");
    }

    #[test]
    fn clocks_never_move_backwards() {
        let live = Liveness::new();
        live.mark_read_at(at(2_000));
        live.mark_read_at(at(1_000));
        assert_eq!(live.last_read(), Some(at(2_000)));

        live.mark_sent_at(at(2_000));
        live.mark_sent_at(at(1_500));
        assert_eq!(live.last_sent(), Some(at(2_000)));
    }

    #[test]
    fn send_is_never_stamped_before_read() {
        let live = Liveness::new();
        live.mark_read_at(at(3_000));
        live.mark_sent_at(at(2_000));
        assert_eq!(live.last_sent(), Some(at(3_000)));
    }

    #[test]
    fn future_stamp_counts_as_fresh() {
        let live = Liveness::new();
        live.mark_read_at(at(10_000));
        live.mark_sent_at(at(10_000));
        assert!(live.check(at(9_000), TEN_MINUTES).is_healthy());
    }

    #[test]
    fn mark_now_sets_both_clocks() {
        let live = Liveness::new();
        live.mark_read();
        live.mark_sent();
        assert!(live.last_sent().unwrap() >= live.last_read().unwrap());
        assert!(live.check(SystemTime::now(), TEN_MINUTES).is_healthy());
    }
}
