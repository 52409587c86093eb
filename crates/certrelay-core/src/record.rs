//! The record that crosses the bus.

use serde::{Deserialize, Serialize};

/// Information about an issued leaf certificate and its issuer (but nothing
/// about the trust chain leading up to the root).
///
/// Field names and the encoding of the timestamps as JSON integers are part
/// of the downstream wire contract; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CertRecord {
    /// Every domain the certificate covers, in upstream order, duplicates kept.
    pub domains: Vec<String>,
    /// Validity start, seconds since the Unix epoch.
    pub not_before: i64,
    /// Validity end, seconds since the Unix epoch.
    pub not_after: i64,
    /// Serial number as the upstream hex string.
    pub serial_number: String,
    /// Always empty: the projection does not populate it.
    pub fingerprint: String,
    /// Aggregated issuer distinguished name.
    pub issuer_cn: String,
}

impl CertRecord {
    /// Encode as the JSON payload handed to a publisher.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> CertRecord {
        CertRecord {
            domains: vec!["a.example".into(), "b.example".into()],
            not_before: 1_700_000_000,
            not_after: 1_731_536_000,
            serial_number: "0A1B".into(),
            fingerprint: String::new(),
            issuer_cn: "CN=Test".into(),
        }
    }

    #[test]
    fn wire_format_is_stable() {
        let json = String::from_utf8(sample().to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"domains":["a.example","b.example"],"not_before":1700000000,"not_after":1731536000,"serial_number":"0A1B","fingerprint":"","issuer_cn":"CN=Test"}"#
        );
    }

    #[test]
    fn decodes_what_it_encodes() {
        let record = sample();
        let back: CertRecord = serde_json::from_slice(&record.to_json().unwrap()).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn timestamps_are_json_numbers() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value["not_before"].is_i64());
        assert!(value["not_after"].is_i64());
    }
}
