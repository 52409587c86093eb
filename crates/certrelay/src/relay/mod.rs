//! The relay loop: subscribe, project, publish, recycle.
//!
//! Each subscription goes through CONNECTING -> RUNNING -> TEARDOWN and the
//! loop starts over indefinitely. While RUNNING the loop waits on whichever
//! comes first: an upstream event, an upstream fault, or the lifetime
//! deadline armed when the subscription started.

pub mod policy;
pub mod teardown;

use std::sync::Arc;

use certrelay_core::{Liveness, project};
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::publisher::Publisher;
use crate::source::{EventSource, Signal, SourceError, Subscription};

pub use policy::{ReconnectPolicy, RelayConfig};
pub use teardown::Teardown;

/// Per-subscription counters, logged at teardown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Events received from upstream.
    pub read: u64,
    /// Events that did not project to a record.
    pub skipped: u64,
    /// Records accepted by the publisher.
    pub published: u64,
}

/// Moves certificate events from an [`EventSource`] to a [`Publisher`].
pub struct Relay<S> {
    source: S,
    publisher: Arc<dyn Publisher>,
    liveness: Arc<Liveness>,
    config: RelayConfig,
}

impl<S: EventSource> Relay<S> {
    pub fn new(
        source: S,
        publisher: Arc<dyn Publisher>,
        liveness: Arc<Liveness>,
        config: RelayConfig,
    ) -> Self {
        Self {
            source,
            publisher,
            liveness,
            config,
        }
    }

    /// Run forever, reconnecting after every teardown.
    ///
    /// Failed subscriptions back off exponentially. The backoff resets after
    /// a subscription that stayed up for `healthy_run`, and lifetime expiry
    /// reconnects without waiting.
    pub async fn run(&self) {
        let mut attempt: u32 = 0;

        for generation in 1_u64.. {
            let started = Instant::now();
            let teardown = match self.source.subscribe().await {
                Ok(subscription) => {
                    info!(generation, backend = self.publisher.backend(), "Subscription started");
                    self.run_subscription(subscription, generation).await
                }
                Err(e) => Teardown::Upstream(e),
            };
            teardown.log(generation);

            if teardown.is_routine() || started.elapsed() >= self.config.healthy_run {
                attempt = 0;
            }
            if teardown.is_routine() {
                continue;
            }

            let delay = self.config.reconnect.delay_for_attempt(attempt);
            warn!(generation, attempt, delay_ms = delay.as_millis(), "Reconnecting");
            sleep(delay).await;
            attempt = attempt.saturating_add(1);
        }
    }

    /// Drive one subscription until it faults or its lifetime runs out, then
    /// release it.
    pub async fn run_subscription(&self, mut subscription: Subscription, generation: u64) -> Teardown {
        let lifetime = sleep(self.config.max_lifetime);
        tokio::pin!(lifetime);
        let mut stats = RunStats::default();

        let teardown = loop {
            tokio::select! {
                signal = subscription.next() => match signal {
                    Signal::Event(event) => {
                        if let Err(teardown) = self.handle_event(&event, &mut stats).await {
                            break teardown;
                        }
                    }
                    Signal::Fault(e) => break Teardown::Upstream(e),
                    Signal::Ended => break Teardown::Upstream(SourceError::Closed),
                },
                () = &mut lifetime => break Teardown::LifetimeExpired(self.config.max_lifetime),
            }
        };

        subscription.release();
        info!(
            generation,
            read = stats.read,
            skipped = stats.skipped,
            published = stats.published,
            "Subscription released"
        );
        teardown
    }

    /// Project one event and publish the result.
    ///
    /// A projection failure still proves the transport is alive, so it
    /// advances `last_read` and is skipped.
    async fn handle_event(&self, event: &Value, stats: &mut RunStats) -> Result<(), Teardown> {
        stats.read += 1;
        let projected = project(event);
        self.liveness.mark_read();

        let record = match projected {
            Ok(record) => record,
            Err(e) => {
                stats.skipped += 1;
                warn!(reason = e.tag(), error = %e, "Skipping event");
                return Ok(());
            }
        };

        debug!(
            serial_number = %record.serial_number,
            domains = record.domains.len(),
            "Projected certificate"
        );
        let payload = record.to_json()?;
        self.publisher.publish(payload).await?;
        self.liveness.mark_sent();
        stats.published += 1;
        Ok(())
    }
}
