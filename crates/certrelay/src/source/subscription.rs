//! One attachment to the upstream stream.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::SourceError;

/// What a subscription produced next.
#[derive(Debug)]
pub enum Signal {
    Event(Value),
    Fault(SourceError),
    /// Both sequences have ended without a reported fault.
    Ended,
}

/// Inbound events and the asynchronous error signal of one connection.
///
/// Both sequences are finite: they end when the transport closes or when the
/// subscription is released. Dropping a `Subscription` releases it.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<Value>,
    errors: mpsc::Receiver<SourceError>,
    reader: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a pair of channel receivers with no background reader.
    pub const fn new(events: mpsc::Receiver<Value>, errors: mpsc::Receiver<SourceError>) -> Self {
        Self {
            events,
            errors,
            reader: None,
        }
    }

    /// Wrap a pair of channel receivers fed by `reader`, which is aborted on
    /// release.
    pub const fn with_reader(
        events: mpsc::Receiver<Value>,
        errors: mpsc::Receiver<SourceError>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            errors,
            reader: Some(reader),
        }
    }

    /// Next inbound event, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<Value> {
        self.events.recv().await
    }

    /// Next transport fault, or `None` once the error signal has closed.
    pub async fn next_error(&mut self) -> Option<SourceError> {
        self.errors.recv().await
    }

    /// Wait for whichever of the two sequences yields first.
    ///
    /// When the error signal closes, buffered events are still delivered
    /// before [`Signal::Ended`]. When the event stream ends, a fault already
    /// queued on the error signal is reported in its place.
    pub async fn next(&mut self) -> Signal {
        tokio::select! {
            event = self.events.recv() => match event {
                Some(event) => Signal::Event(event),
                None => self.errors.try_recv().map_or(Signal::Ended, Signal::Fault),
            },
            fault = self.errors.recv() => match fault {
                Some(fault) => Signal::Fault(fault),
                None => self.events.recv().await.map_or(Signal::Ended, Signal::Event),
            },
        }
    }

    /// Close both sequences and stop the reader.
    pub fn release(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.events.close();
        self.errors.close();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}
