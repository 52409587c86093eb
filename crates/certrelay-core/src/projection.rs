//! Projection of certstream events onto [`CertRecord`].
//!
//! Upstream events are JSON objects discriminated by `message_type`. Only
//! `certificate_update` carries a certificate; every other discriminator is a
//! projection failure, not a silently ignored value.

use serde_json::Value;

use crate::error::ProjectionError;
use crate::record::CertRecord;

/// The only discriminator that yields a record.
pub const CERTIFICATE_UPDATE: &str = "certificate_update";

const MESSAGE_TYPE: Field = Field::new("/message_type", "message_type");
const ALL_DOMAINS: Field = Field::new(
    "/data/leaf_cert/all_domains",
    "data.leaf_cert.all_domains",
);
const NOT_BEFORE: Field = Field::new("/data/leaf_cert/not_before", "data.leaf_cert.not_before");
const NOT_AFTER: Field = Field::new("/data/leaf_cert/not_after", "data.leaf_cert.not_after");
const SERIAL_NUMBER: Field = Field::new(
    "/data/leaf_cert/serial_number",
    "data.leaf_cert.serial_number",
);
const ISSUER_AGGREGATED: Field = Field::new(
    "/data/leaf_cert/issuer/aggregated",
    "data.leaf_cert.issuer.aggregated",
);

/// A required field: JSON pointer for lookup, dotted name for reporting.
struct Field {
    pointer: &'static str,
    name: &'static str,
}

impl Field {
    const fn new(pointer: &'static str, name: &'static str) -> Self {
        Self { pointer, name }
    }

    fn lookup<'a>(&self, event: &'a Value) -> Result<&'a Value, ProjectionError> {
        event
            .pointer(self.pointer)
            .ok_or(ProjectionError::FieldMissing(self.name))
    }

    fn string(&self, event: &Value) -> Result<String, ProjectionError> {
        self.lookup(event)?
            .as_str()
            .map(str::to_owned)
            .ok_or(ProjectionError::FieldMissing(self.name))
    }

    fn strings(&self, event: &Value) -> Result<Vec<String>, ProjectionError> {
        self.lookup(event)?
            .as_array()
            .ok_or(ProjectionError::FieldMissing(self.name))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or(ProjectionError::FieldMissing(self.name))
            })
            .collect()
    }

    /// Integers arrive either as JSON integers or as floats such as
    /// `1700000000.0`; floats are truncated toward zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn int(&self, event: &Value) -> Result<i64, ProjectionError> {
        let value = self.lookup(event)?;
        if let Some(i) = value.as_i64() {
            return Ok(i);
        }
        match value.as_f64() {
            Some(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(f.trunc() as i64)
            }
            _ => Err(ProjectionError::FieldMissing(self.name)),
        }
    }
}

/// Project one upstream event onto a [`CertRecord`].
///
/// Pure: the result depends only on `event`. Fields are checked in wire
/// order and the first failure is reported.
pub fn project(event: &Value) -> Result<CertRecord, ProjectionError> {
    let message_type = MESSAGE_TYPE.string(event)?;
    if message_type != CERTIFICATE_UPDATE {
        return Err(ProjectionError::UnknownType(message_type));
    }

    Ok(CertRecord {
        domains: ALL_DOMAINS.strings(event)?,
        not_before: NOT_BEFORE.int(event)?,
        not_after: NOT_AFTER.int(event)?,
        serial_number: SERIAL_NUMBER.string(event)?,
        fingerprint: String::new(),
        issuer_cn: ISSUER_AGGREGATED.string(event)?,
    })
}
