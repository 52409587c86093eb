//! Error types for the `certrelay` core library.

use thiserror::Error;

/// Reasons an upstream event could not be projected onto a `CertRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The `message_type` discriminator is not `certificate_update`.
    #[error("Encountered unknown message type {0:?}")]
    UnknownType(String),

    /// A required field is absent or does not have the expected shape.
    /// Carries the dotted path of the first offending field.
    #[error("Missing or malformed field {0}")]
    FieldMissing(&'static str),
}

impl ProjectionError {
    /// Short tag used as a structured logging field.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::UnknownType(_) => "unknown_type",
            Self::FieldMissing(_) => "field_missing",
        }
    }
}
