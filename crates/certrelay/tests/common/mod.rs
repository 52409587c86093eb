//! In-memory stand-ins for the upstream stream and the downstream bus.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use certrelay::publisher::{PublishError, Publisher};
use certrelay::source::{EventSource, SourceError, Subscription};

/// A `certificate_update` event for `serial`.
pub fn cert_event(serial: &str) -> Value {
    json!({
        "message_type": "certificate_update",
        "data": {
            "update_type": "X509LogEntry",
            "leaf_cert": {
                "all_domains": ["a.example", "b.example"],
                "not_before": 1_700_000_000,
                "not_after": 1_731_536_000,
                "serial_number": serial,
                "issuer": { "aggregated": "CN=Test" }
            }
        }
    })
}

pub fn heartbeat() -> Value {
    json!({"message_type": "heartbeat", "timestamp": 1_700_000_000.0})
}

/// How a scripted subscription ends once its events are delivered.
#[derive(Debug, Clone, Copy)]
pub enum End {
    /// Report a transport fault after every event has been consumed.
    Fault,
    /// Close both sequences.
    Close,
    /// Stay open and silent.
    Hang,
}

/// One scripted answer to `subscribe`.
#[derive(Debug)]
pub enum Step {
    Refuse,
    Deliver(Vec<Value>, End),
}

#[derive(Default)]
struct Script {
    steps: Mutex<VecDeque<Step>>,
    subscribes: AtomicUsize,
    held: Mutex<Vec<(mpsc::Sender<Value>, mpsc::Sender<SourceError>)>>,
}

/// An [`EventSource`] that plays back [`Step`]s, then hangs forever.
#[derive(Clone, Default)]
pub struct ScriptedSource(Arc<Script>);

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let source = Self::default();
        source.0.steps.lock().unwrap().extend(steps);
        source
    }

    pub fn subscribes(&self) -> usize {
        self.0.subscribes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        self.0.subscribes.fetch_add(1, Ordering::SeqCst);
        let step = self
            .0
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Deliver(Vec::new(), End::Hang));

        let (events, end) = match step {
            Step::Refuse => return Err(SourceError::Connect("connection refused".into())),
            Step::Deliver(events, end) => (events, end),
        };

        let (tx, rx) = mpsc::channel(events.len().max(1));
        let (etx, erx) = mpsc::channel(1);
        for event in events {
            tx.try_send(event).unwrap();
        }

        match end {
            End::Close => {}
            End::Hang => self.0.held.lock().unwrap().push((tx, etx)),
            End::Fault => {
                tokio::spawn(async move {
                    // Hold the fault back until the consumer has drained the
                    // buffered events.
                    while tx.capacity() < tx.max_capacity() && !tx.is_closed() {
                        tokio::task::yield_now().await;
                    }
                    let _ = etx.send(SourceError::Transport("connection reset".into())).await;
                    drop(tx);
                });
            }
        }
        Ok(Subscription::new(rx, erx))
    }
}

/// A [`Publisher`] that records every payload it accepts.
#[derive(Default)]
pub struct RecordingPublisher {
    accepted: Mutex<Vec<Vec<u8>>>,
    attempts: AtomicUsize,
    fail_from: Option<usize>,
}

impl RecordingPublisher {
    /// Refuse every publish from the `n`th attempt on (0-indexed).
    pub fn failing_from(n: usize) -> Self {
        Self {
            fail_from: Some(n),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|p| String::from_utf8(p.clone()).unwrap())
            .collect()
    }

    pub fn records(&self) -> Vec<Value> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .map(|p| serde_json::from_slice(p).unwrap())
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn backend(&self) -> &'static str {
        "recording"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<(), PublishError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.is_some_and(|n| attempt >= n) {
            return Err(PublishError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.accepted.lock().unwrap().push(payload);
        Ok(())
    }
}
