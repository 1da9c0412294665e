use std::{future::Future, sync::Arc};

use dslab_types::{MempoolEvent, Network};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::info;

use crate::{Epoch, EpochEvent, MempoolStream, StreamError, StreamOptions, Subscription};

/// Opens mempool subscriptions scoped to one address on one network.
pub trait EventSource {
    fn subscribe(
        &self,
        address: &str,
        network: Network,
        epoch: Epoch,
    ) -> impl Future<Output = Result<Subscription, StreamError>>;
}

/// Subscribes over a live websocket feed.
#[derive(Debug, Clone, Default)]
pub struct WebSocketSource {
    options: StreamOptions,
}

impl WebSocketSource {
    pub fn new(options: StreamOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }
}

impl EventSource for WebSocketSource {
    async fn subscribe(
        &self,
        address: &str,
        network: Network,
        epoch: Epoch,
    ) -> Result<Subscription, StreamError> {
        let url = self.options.endpoints.url(network);

        let (stream, receiver) = tokio::time::timeout(
            self.options.connect_timeout,
            MempoolStream::connect(url, epoch, self.options.channel_capacity),
        )
        .await
        .map_err(|_| StreamError::ConnectTimeout(url.to_string()))??;

        if let Some(message) = self.options.subscribe.message(address) {
            stream.send_json(&message).await?;
        }

        info!("Subscribed to mempool feed {url} for {address} on {network} ({epoch})");

        Ok(Subscription::new(
            epoch,
            address,
            network,
            receiver,
            Some(stream),
        ))
    }
}

/// An in-process source whose events are pushed by hand.
#[derive(Debug, Clone, Default)]
pub struct ChannelSource {
    state: Arc<Mutex<ChannelSourceState>>,
    capacity: Option<usize>,
}

#[derive(Debug, Default)]
struct ChannelSourceState {
    opened: Vec<(Epoch, String, Network)>,
    senders: Vec<(Epoch, mpsc::Sender<EpochEvent>)>,
    unavailable: Option<String>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::default(),
            capacity: Some(capacity),
        }
    }

    /// Every subscription opened so far, oldest first.
    pub fn subscriptions(&self) -> Vec<(Epoch, String, Network)> {
        self.state.lock().opened.clone()
    }

    pub fn latest_epoch(&self) -> Option<Epoch> {
        self.state.lock().senders.last().map(|(epoch, _)| *epoch)
    }

    pub fn is_open(&self, epoch: Epoch) -> bool {
        self.state
            .lock()
            .senders
            .iter()
            .any(|(open, sender)| *open == epoch && !sender.is_closed())
    }

    /// Delivers `event` to the newest subscription, tagged with its own epoch.
    pub fn push(&self, event: MempoolEvent) -> bool {
        let state = self.state.lock();
        let Some((epoch, sender)) = state.senders.last() else {
            return false;
        };
        sender
            .try_send(EpochEvent {
                epoch: *epoch,
                event,
            })
            .is_ok()
    }

    /// Delivers `event` to the newest subscription under an arbitrary epoch, as a late
    /// frame from an older connection would arrive.
    pub fn push_tagged(&self, epoch: Epoch, event: MempoolEvent) -> bool {
        let state = self.state.lock();
        let Some((_, sender)) = state.senders.last() else {
            return false;
        };
        sender.try_send(EpochEvent { epoch, event }).is_ok()
    }

    /// Ends every open subscription as if the feed had hung up.
    pub fn close_all(&self) {
        self.state.lock().senders.clear();
    }

    /// Makes the following subscribe calls fail until [`ChannelSource::restore`].
    pub fn fail_with(&self, reason: impl Into<String>) {
        self.state.lock().unavailable = Some(reason.into());
    }

    pub fn restore(&self) {
        self.state.lock().unavailable = None;
    }
}

impl EventSource for ChannelSource {
    async fn subscribe(
        &self,
        address: &str,
        network: Network,
        epoch: Epoch,
    ) -> Result<Subscription, StreamError> {
        let mut state = self.state.lock();

        if let Some(reason) = &state.unavailable {
            return Err(StreamError::Unavailable(reason.clone()));
        }

        let (sender, receiver) = mpsc::channel(self.capacity.unwrap_or(32));
        state.senders.retain(|(_, sender)| !sender.is_closed());
        state.senders.push((epoch, sender));
        state.opened.push((epoch, address.to_string(), network));

        Ok(Subscription::new(epoch, address, network, receiver, None))
    }
}
