//! `certrelay` Core Library
//!
//! Shared functionality for the certificate-transparency relay:
//! - `CertRecord`, the compact record published downstream
//! - Projection of certstream events onto `CertRecord`
//! - Liveness clocks shared between the relay loop and the health surface
//! - Common error types and tracing initialisation

pub mod error;
pub mod liveness;
pub mod projection;
pub mod record;
pub mod tracing_init;

pub use error::ProjectionError;
pub use liveness::{HealthReport, Liveness};
pub use projection::project;
pub use record::CertRecord;
