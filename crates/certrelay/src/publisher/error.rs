//! Publisher error types.

/// Errors raised while constructing a publisher or handing it a record.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The backend client could not be constructed.
    #[error("Failed to set up {backend} publisher: {reason}")]
    Setup {
        backend: &'static str,
        reason: String,
    },

    /// The binary was built without support for this backend.
    #[error("Backend {0} is not compiled into this build")]
    Unavailable(&'static str),

    /// The request never produced a response.
    #[error("Publish request error: {0}")]
    Request(String),

    /// The backend answered but refused the message.
    #[error("Publish rejected (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The backend client refused to enqueue the message.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The delivery-report drainer is gone.
    #[error("Delivery report queue closed")]
    QueueClosed,
}
