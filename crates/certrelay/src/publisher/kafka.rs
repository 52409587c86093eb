//! Kafka publisher.
//!
//! `publish` only enqueues into librdkafka's producer queue. Broker
//! acknowledgements arrive later as delivery futures, which are handed to a
//! background drainer whose only job is to log failures. Delivery failures
//! never reach the relay loop.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::{PublishError, Publisher};
use crate::config::KafkaConfig;

/// Outstanding delivery reports held before `publish` starts to block.
pub const DELIVERY_QUEUE_CAPACITY: usize = 10_000;

/// Pause before retrying when librdkafka's local queue is full.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

impl KafkaConfig {
    /// librdkafka producer configuration. Acknowledgement policy is fixed to
    /// all in-sync replicas.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id)
            .set("acks", "all")
            .set("security.protocol", &self.security_protocol);
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            config
                .set("sasl.mechanism", &self.sasl_mechanism)
                .set("sasl.username", username)
                .set("sasl.password", password);
        }
        config
    }
}

/// Async-queuing publisher onto one Kafka topic; partition is left to
/// librdkafka.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    reports: mpsc::Sender<DeliveryFuture>,
}

impl KafkaPublisher {
    /// Create the producer and spawn the delivery-report drainer.
    pub fn new(config: &KafkaConfig) -> Result<Self, PublishError> {
        let producer: FutureProducer =
            config
                .client_config()
                .create()
                .map_err(|e: KafkaError| PublishError::Setup {
                    backend: "kafka",
                    reason: e.to_string(),
                })?;

        let (reports, rx) = mpsc::channel(DELIVERY_QUEUE_CAPACITY);
        tokio::spawn(drain_delivery_reports(rx));

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            client_id = %config.client_id,
            "Kafka producer created"
        );
        Ok(Self {
            producer,
            topic: config.topic.clone(),
            reports,
        })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    fn backend(&self) -> &'static str {
        "kafka"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        loop {
            let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(payload.as_slice());
            match self.producer.send_result(record) {
                Ok(delivery) => {
                    // Blocks while the drainer is behind: that is the backpressure.
                    return self
                        .reports
                        .send(delivery)
                        .await
                        .map_err(|_| PublishError::QueueClosed);
                }
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                    debug!("Producer queue full, waiting");
                    tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
                }
                Err((e, _)) => return Err(PublishError::Backend(e.to_string())),
            }
        }
    }
}

/// Await delivery reports in submission order and log the failures.
async fn drain_delivery_reports(mut reports: mpsc::Receiver<DeliveryFuture>) {
    while let Some(delivery) = reports.recv().await {
        match delivery.await {
            Ok(Ok((partition, offset))) => trace!(partition, offset, "Message delivered"),
            Ok(Err((e, _message))) => warn!(error = %e, "Failed to deliver message"),
            Err(_canceled) => warn!("Delivery report dropped by producer"),
        }
    }
    debug!("Delivery report drainer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sasl_config() -> KafkaConfig {
        KafkaConfig {
            brokers: "b1:9096,b2:9096".into(),
            client_id: "certrelay-test".into(),
            topic: "certs".into(),
            security_protocol: "sasl_ssl".into(),
            sasl_mechanism: "SCRAM-SHA-256".into(),
            username: Some("alice".into()),
            password: Some("s3cret".into()),
        }
    }

    #[test]
    fn client_config_carries_credentials() {
        let config = sasl_config().client_config();
        assert_eq!(config.get("bootstrap.servers"), Some("b1:9096,b2:9096"));
        assert_eq!(config.get("client.id"), Some("certrelay-test"));
        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("security.protocol"), Some("sasl_ssl"));
        assert_eq!(config.get("sasl.mechanism"), Some("SCRAM-SHA-256"));
        assert_eq!(config.get("sasl.username"), Some("alice"));
        assert_eq!(config.get("sasl.password"), Some("s3cret"));
    }

    #[test]
    fn plaintext_config_has_no_sasl() {
        let mut kafka = sasl_config();
        kafka.security_protocol = "plaintext".into();
        kafka.username = None;
        kafka.password = None;
        let config = kafka.client_config();
        assert_eq!(config.get("security.protocol"), Some("plaintext"));
        assert!(config.get("sasl.username").is_none());
    }

    #[tokio::test]
    async fn producer_creation_does_not_need_a_reachable_broker() {
        let mut kafka = sasl_config();
        kafka.brokers = "127.0.0.1:1".into();
        kafka.security_protocol = "plaintext".into();
        kafka.username = None;
        kafka.password = None;
        let publisher = KafkaPublisher::new(&kafka);
        assert!(publisher.is_ok());
    }
}
