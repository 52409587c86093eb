//! Why a subscription ended.

use std::time::Duration;

use tracing::{error, info};

use crate::publisher::PublishError;
use crate::source::SourceError;

/// The reason the relay left the RUNNING state.
#[derive(Debug, thiserror::Error)]
pub enum Teardown {
    /// The subscription reached its forced lifetime.
    #[error("Subscription lifetime of {0:?} expired")]
    LifetimeExpired(Duration),

    /// The event source reported a fault or ended.
    #[error("Upstream error: {0}")]
    Upstream(#[from] SourceError),

    /// A projected record could not be encoded.
    #[error("Error serializing record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The publisher refused a record synchronously.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl Teardown {
    /// Expected, periodic teardown as opposed to a fault.
    pub const fn is_routine(&self) -> bool {
        matches!(self, Self::LifetimeExpired(_))
    }

    /// Log the teardown at the level its kind calls for.
    pub fn log(&self, generation: u64) {
        if self.is_routine() {
            info!(generation, reason = %self, "Recycling subscription");
        } else {
            error!(generation, error = %self, "Tearing down subscription");
        }
    }
}
