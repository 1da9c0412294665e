use std::sync::Arc;

use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::Value;
use tokio::{
    net::TcpStream,
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::{parse_message, Epoch, EpochEvent, StreamError};

type WebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Sink = SplitSink<WebSocket, tungstenite::Message>;
type Stream = SplitStream<WebSocket>;

/// A websocket connection to the mempool feed.
///
/// Inbound frames are parsed on a background task and forwarded as [`EpochEvent`]s.
#[derive(Debug, Clone)]
pub struct MempoolStream(Arc<MempoolStreamInner>);

#[derive(Debug)]
struct MempoolStreamInner {
    sink: Mutex<Sink>,
    inbound_handle: JoinHandle<()>,
    url: String,
    epoch: Epoch,
}

impl MempoolStream {
    /// Connects to a websocket URL such as `wss://mempool.space/testnet/ws`.
    pub async fn connect(
        url: &str,
        epoch: Epoch,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<EpochEvent>), StreamError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self::from_websocket(ws, url, epoch, capacity))
    }

    /// Wraps an already established connection.
    pub fn from_websocket(
        ws: WebSocket,
        url: impl Into<String>,
        epoch: Epoch,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<EpochEvent>) {
        let (sink, stream) = ws.split();
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let inbound_handle = tokio::spawn(async move {
            if let Err(error) = handle_inbound_messages(stream, sender, epoch).await {
                debug!("Error handling mempool message: {error}");
            }
        });

        let stream = Self(Arc::new(MempoolStreamInner {
            sink: Mutex::new(sink),
            inbound_handle,
            url: url.into(),
            epoch,
        }));

        (stream, receiver)
    }

    pub fn url(&self) -> &str {
        &self.0.url
    }

    pub fn epoch(&self) -> Epoch {
        self.0.epoch
    }

    pub async fn send_json(&self, value: &Value) -> Result<(), StreamError> {
        let text = serde_json::to_string(value)?;
        self.0
            .sink
            .lock()
            .await
            .send(tungstenite::Message::Text(text))
            .await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<(), StreamError> {
        self.0.sink.lock().await.close().await?;
        Ok(())
    }
}

impl Drop for MempoolStreamInner {
    fn drop(&mut self) {
        self.inbound_handle.abort();
    }
}

async fn handle_inbound_messages(
    mut stream: Stream,
    sender: mpsc::Sender<EpochEvent>,
    epoch: Epoch,
) -> Result<(), StreamError> {
    use tungstenite::Message::{Binary, Close, Frame, Ping, Pong, Text};

    while let Some(message) = stream.next().await {
        let message = message?;

        match message {
            Close(..) => break,
            Ping(..) | Pong(..) | Frame(..) => {}
            Binary(binary) => {
                trace!("Ignoring {} byte binary frame", binary.len());
            }
            Text(text) => {
                for event in parse_message(&text) {
                    if sender.send(EpochEvent { epoch, event }).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    Ok(())
}
