//! Upstream certificate event sources.
//!
//! An [`EventSource`] attaches to the upstream stream and hands back a
//! [`Subscription`]: a sequence of decoded JSON events plus a separate error
//! signal. The relay loop owns the subscription exclusively and releases it
//! before reconnecting.

pub mod certstream;
pub mod error;
pub mod subscription;

use async_trait::async_trait;

pub use certstream::CertstreamSource;
pub use error::SourceError;
pub use subscription::{Signal, Subscription};

/// Something the relay can subscribe to.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Attach to the upstream stream. Failing here is the CONNECTING ->
    /// TEARDOWN edge of the relay state machine.
    async fn subscribe(&self) -> Result<Subscription, SourceError>;
}
