use std::{fmt, time::Duration};

use dslab_types::{MempoolEvent, Network};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{MempoolStream, StreamEndpoints};

/// How long a close handshake may take before the connection is dropped without one.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Generation counter for subscriptions. Each new subscription gets a later epoch than the last.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A feed event stamped with the epoch of the subscription that delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEvent {
    pub epoch: Epoch,
    pub event: MempoolEvent,
}

/// The first message sent after connecting, asking the feed for relevant events.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubscribeRequest {
    /// Send nothing and take whatever the feed pushes.
    None,
    /// `{ "track-address": "<address>" }`
    #[default]
    TrackAddress,
    /// `{ "action": "want", "data": [topics] }`
    Want(Vec<String>),
    /// Sent verbatim.
    Custom(Value),
}

impl SubscribeRequest {
    pub fn message(&self, address: &str) -> Option<Value> {
        match self {
            Self::None => None,
            Self::TrackAddress => Some(json!({ "track-address": address })),
            Self::Want(topics) => Some(json!({ "action": "want", "data": topics })),
            Self::Custom(value) => Some(value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    pub endpoints: StreamEndpoints,
    pub subscribe: SubscribeRequest,
    pub channel_capacity: usize,
    pub connect_timeout: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            endpoints: StreamEndpoints::default(),
            subscribe: SubscribeRequest::default(),
            channel_capacity: 32,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// An open feed for one `(address, network)`.
///
/// Dropping it stops delivery: the receiver is released and any reader task is aborted.
#[derive(Debug)]
pub struct Subscription {
    epoch: Epoch,
    address: String,
    network: Network,
    receiver: mpsc::Receiver<EpochEvent>,
    stream: Option<MempoolStream>,
}

impl Subscription {
    pub fn new(
        epoch: Epoch,
        address: impl Into<String>,
        network: Network,
        receiver: mpsc::Receiver<EpochEvent>,
        stream: Option<MempoolStream>,
    ) -> Self {
        Self {
            epoch,
            address: address.into(),
            network,
            receiver,
            stream,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_for(&self, address: &str, network: Network) -> bool {
        self.address == address && self.network == network
    }

    /// Waits for the next event. `None` means the feed has ended.
    pub async fn recv(&mut self) -> Option<EpochEvent> {
        self.receiver.recv().await
    }

    /// Returns a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<EpochEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub async fn close(mut self) {
        self.receiver.close();

        let Some(stream) = self.stream.take() else {
            return;
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, stream.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::debug!("error closing mempool stream: {error}"),
            Err(_) => tracing::debug!(
                "gave up closing {} after {CLOSE_TIMEOUT:?}",
                stream.url()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epochs_increase() {
        let first = Epoch::default();
        assert!(first.next() > first);
        assert_eq!(first.next().next().value(), 2);
    }

    #[test]
    fn test_subscribe_messages() {
        let address = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

        assert_eq!(SubscribeRequest::None.message(address), None);
        assert_eq!(
            SubscribeRequest::TrackAddress.message(address),
            Some(json!({ "track-address": address }))
        );
        assert_eq!(
            SubscribeRequest::Want(vec!["blocks".to_string()]).message(address),
            Some(json!({ "action": "want", "data": ["blocks"] }))
        );
    }
}
