//! Publisher that discards everything.

use async_trait::async_trait;
use tracing::debug;

use super::{PublishError, Publisher};

/// Logs each record at debug level and drops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

#[async_trait]
impl Publisher for NullPublisher {
    fn backend(&self) -> &'static str {
        "none"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        debug!(payload = %String::from_utf8_lossy(&payload), "Discarding record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_accepts() {
        assert!(NullPublisher.publish(b"{}".to_vec()).await.is_ok());
        assert!(NullPublisher.publish(Vec::new()).await.is_ok());
    }
}
