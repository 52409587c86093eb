//! certrelay - certificate transparency stream relay.
//!
//! Subscribes to a certstream WebSocket, projects every certificate update to
//! a compact [`CertRecord`](certrelay_core::CertRecord), and publishes it to
//! Kafka or PubNub. A liveness endpoint reports whether records are still
//! flowing.

pub mod config;
pub mod health;
pub mod publisher;
pub mod relay;
pub mod source;
