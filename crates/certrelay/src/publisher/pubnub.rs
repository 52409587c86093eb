//! PubNub REST publisher.
//!
//! Publishes each record with one `POST /publish/{pub}/{sub}/0/{channel}/0`
//! request and waits for the broker's answer, so the caller backpressures on
//! round-trip latency.

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use super::{PublishError, Publisher};
use crate::config::PubNubConfig;

/// Synchronous-request publisher for a PubNub channel.
#[derive(Debug)]
pub struct PubNubPublisher {
    http: reqwest::Client,
    url: Url,
}

impl PubNubPublisher {
    /// Build a publisher with a fresh HTTP client.
    pub fn new(config: &PubNubConfig) -> Result<Self, PublishError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| setup_error(e.to_string()))?;
        Self::with_client(config, http)
    }

    /// Build a publisher around an existing HTTP client.
    pub fn with_client(config: &PubNubConfig, http: reqwest::Client) -> Result<Self, PublishError> {
        Ok(Self {
            http,
            url: publish_url(config)?,
        })
    }

    /// The resolved publish endpoint (without the message).
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

fn setup_error(reason: String) -> PublishError {
    PublishError::Setup {
        backend: "pubnub",
        reason,
    }
}

/// `{origin}/publish/{pub}/{sub}/0/{channel}/0?uuid={uuid}` with every
/// segment percent-encoded.
fn publish_url(config: &PubNubConfig) -> Result<Url, PublishError> {
    let mut url = Url::parse(&config.origin)
        .map_err(|e| setup_error(format!("invalid origin {:?}: {e}", config.origin)))?;
    url.path_segments_mut()
        .map_err(|()| setup_error(format!("origin {:?} cannot be a base URL", config.origin)))?
        .pop_if_empty()
        .extend([
            "publish",
            config.publish_key.as_str(),
            config.subscribe_key.as_str(),
            "0",
            config.channel.as_str(),
            "0",
        ]);
    url.query_pairs_mut().append_pair("uuid", &config.uuid);
    Ok(url)
}

#[async_trait]
impl Publisher for PubNubPublisher {
    fn backend(&self) -> &'static str {
        "pubnub"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // Success is `[1, "Sent", "<timetoken>"]`.
        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        if parsed.get(0).and_then(Value::as_i64) != Some(1) {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(timetoken = %parsed[2], "Published to PubNub");
        Ok(())
    }
}
