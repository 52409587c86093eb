//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it; the environment names match what deployments already
//! export (`KAFKA_BROKER`, `PN_PUBLISH_KEY`, `PORT`, ...).

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::relay::RelayConfig;
use crate::source::certstream::{CertstreamConfig, DEFAULT_CERTSTREAM_URL};

/// Downstream bus selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Durable partitioned log.
    Kafka,
    /// Hosted pub/sub channel.
    Pubnub,
    /// Log and discard.
    #[value(name = "none")]
    Null,
}

/// Kafka when it is compiled in, PubNub otherwise.
#[cfg(feature = "kafka")]
pub const DEFAULT_BACKEND: &str = "kafka";
#[cfg(not(feature = "kafka"))]
pub const DEFAULT_BACKEND: &str = "pubnub";

#[derive(Parser, Debug)]
#[command(name = "certrelay")]
#[command(
    version,
    about = "Certificate transparency relay - certstream to Kafka or PubNub"
)]
pub struct Args {
    /// Downstream backend.
    #[arg(long, value_enum, default_value = DEFAULT_BACKEND, env = "RELAY_BACKEND")]
    pub backend: Backend,

    /// HTTP port for the liveness endpoint.
    #[arg(long, default_value_t = 8080, env = "PORT")]
    pub port: u16,

    /// Upstream certstream WebSocket URL.
    #[arg(long, default_value = DEFAULT_CERTSTREAM_URL, env = "CERTSTREAM_URL")]
    pub certstream_url: String,

    /// Seconds after which a subscription is recycled even if healthy.
    #[arg(
        long,
        default_value_t = 600,
        env = "MAX_LIFETIME_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_lifetime_secs: u64,

    /// Seconds without a read or a send before the health check fails.
    #[arg(
        long,
        default_value_t = 600,
        env = "MAX_STALENESS_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_staleness_secs: u64,

    /// Kafka bootstrap servers.
    #[arg(long, env = "KAFKA_BROKER")]
    pub kafka_broker: Option<String>,

    /// Kafka producer client id.
    #[arg(long, default_value = "certrelay", env = "KAFKA_CLIENTID")]
    pub kafka_client_id: String,

    /// Kafka SASL username.
    #[arg(long, env = "KAFKA_USER")]
    pub kafka_user: Option<String>,

    /// Kafka SASL password.
    #[arg(long, env = "KAFKA_PASSWORD", hide_env_values = true)]
    pub kafka_password: Option<String>,

    /// Kafka destination topic.
    #[arg(long, env = "KAFKA_TOPIC")]
    pub kafka_topic: Option<String>,

    /// librdkafka `security.protocol`.
    #[arg(long, default_value = "sasl_ssl", env = "KAFKA_SECURITY_PROTOCOL")]
    pub kafka_security_protocol: String,

    /// librdkafka `sasl.mechanism`.
    #[arg(long, default_value = "SCRAM-SHA-256", env = "KAFKA_SASL_MECHANISM")]
    pub kafka_sasl_mechanism: String,

    /// PubNub subscribe key.
    #[arg(long, env = "PN_SUBSCRIBE_KEY")]
    pub pn_subscribe_key: Option<String>,

    /// PubNub publish key.
    #[arg(long, env = "PN_PUBLISH_KEY", hide_env_values = true)]
    pub pn_publish_key: Option<String>,

    /// PubNub client UUID.
    #[arg(long, env = "PN_UUID")]
    pub pn_uuid: Option<String>,

    /// PubNub REST origin.
    #[arg(long, default_value = "https://ps.pndsn.com", env = "PN_ORIGIN")]
    pub pn_origin: String,

    /// PubNub channel.
    #[arg(long, default_value = "certstream", env = "PN_CHANNEL")]
    pub pn_channel: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// Configuration errors detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
}

/// Kafka producer settings.
#[derive(Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub client_id: String,
    pub topic: String,
    pub security_protocol: String,
    pub sasl_mechanism: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for KafkaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaConfig")
            .field("brokers", &self.brokers)
            .field("client_id", &self.client_id)
            .field("topic", &self.topic)
            .field("security_protocol", &self.security_protocol)
            .field("sasl_mechanism", &self.sasl_mechanism)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// PubNub publish settings.
#[derive(Debug, Clone)]
pub struct PubNubConfig {
    pub origin: String,
    pub publish_key: String,
    pub subscribe_key: String,
    pub uuid: String,
    pub channel: String,
}

/// Validated backend selection.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Kafka(KafkaConfig),
    PubNub(PubNubConfig),
    Null,
}

/// An unset or empty value counts as missing.
fn required(value: Option<&str>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::Missing(name))
}

impl Args {
    /// Validate the settings of the selected backend.
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        match self.backend {
            Backend::Kafka => {
                let brokers = required(self.kafka_broker.as_deref(), "KAFKA_BROKER")?;
                let topic = required(self.kafka_topic.as_deref(), "KAFKA_TOPIC")?;
                let (username, password) = if self.uses_sasl() {
                    (
                        Some(required(self.kafka_user.as_deref(), "KAFKA_USER")?),
                        Some(required(self.kafka_password.as_deref(), "KAFKA_PASSWORD")?),
                    )
                } else {
                    (None, None)
                };
                Ok(BackendConfig::Kafka(KafkaConfig {
                    brokers,
                    client_id: self.kafka_client_id.clone(),
                    topic,
                    security_protocol: self.kafka_security_protocol.clone(),
                    sasl_mechanism: self.kafka_sasl_mechanism.clone(),
                    username,
                    password,
                }))
            }
            Backend::Pubnub => Ok(BackendConfig::PubNub(PubNubConfig {
                origin: self.pn_origin.clone(),
                subscribe_key: required(self.pn_subscribe_key.as_deref(), "PN_SUBSCRIBE_KEY")?,
                publish_key: required(self.pn_publish_key.as_deref(), "PN_PUBLISH_KEY")?,
                uuid: required(self.pn_uuid.as_deref(), "PN_UUID")?,
                channel: self.pn_channel.clone(),
            })),
            Backend::Null => Ok(BackendConfig::Null),
        }
    }

    fn uses_sasl(&self) -> bool {
        self.kafka_security_protocol
            .to_ascii_lowercase()
            .starts_with("sasl")
    }

    /// Liveness endpoint address (all interfaces).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub const fn max_staleness(&self) -> Duration {
        Duration::from_secs(self.max_staleness_secs)
    }

    pub fn certstream_config(&self) -> CertstreamConfig {
        CertstreamConfig::new(self.certstream_url.clone())
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            max_lifetime: Duration::from_secs(self.max_lifetime_secs),
            ..RelayConfig::default()
        }
    }
}
