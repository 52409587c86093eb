//! Downstream publishers.
//!
//! Every backend implements [`Publisher`]; the relay loop only sees the
//! trait object. Three backends exist:
//! - [`KafkaPublisher`] (feature `kafka`): enqueue into the producer queue,
//!   broker acknowledgements are drained and logged in the background
//! - [`PubNubPublisher`] (feature `pubnub`): one synchronous REST publish per
//!   record
//! - [`NullPublisher`]: log and discard

pub mod error;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod null;
#[cfg(feature = "pubnub")]
pub mod pubnub;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BackendConfig;

pub use error::PublishError;
#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;
pub use null::NullPublisher;
#[cfg(feature = "pubnub")]
pub use pubnub::PubNubPublisher;

/// A sink for serialized certificate records.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    /// Hand one JSON-encoded record to the backend.
    ///
    /// `Ok` means accepted: enqueued for asynchronous backends, acknowledged
    /// for synchronous ones. An `Err` makes the relay drop its subscription.
    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError>;
}

/// Construct the publisher selected by `config`.
///
/// Must be called from within a tokio runtime: the Kafka backend spawns its
/// delivery-report drainer here.
pub fn build_publisher(config: &BackendConfig) -> Result<Arc<dyn Publisher>, PublishError> {
    match config {
        #[cfg(feature = "kafka")]
        BackendConfig::Kafka(kafka) => Ok(Arc::new(KafkaPublisher::new(kafka)?)),
        #[cfg(not(feature = "kafka"))]
        BackendConfig::Kafka(_) => Err(PublishError::Unavailable("kafka")),
        #[cfg(feature = "pubnub")]
        BackendConfig::PubNub(pubnub) => Ok(Arc::new(PubNubPublisher::new(pubnub)?)),
        #[cfg(not(feature = "pubnub"))]
        BackendConfig::PubNub(_) => Err(PublishError::Unavailable("pubnub")),
        BackendConfig::Null => Ok(Arc::new(NullPublisher)),
    }
}
