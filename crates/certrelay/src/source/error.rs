//! Event source error types.

use std::time::Duration;

/// Transport and decoding faults raised by an [`EventSource`](super::EventSource).
///
/// Any one of these is fatal for the subscription that produced it.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Handshake did not complete within {0:?}")]
    Handshake(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Error decoding json frame: {0}")]
    Decode(String),

    #[error("No frame received for {0:?}")]
    Idle(Duration),

    #[error("Stream closed by peer")]
    Closed,
}
