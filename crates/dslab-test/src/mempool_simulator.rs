use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};

#[derive(Debug, Error)]
pub enum MempoolSimulatorError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

type Clients = Arc<Mutex<Vec<mpsc::UnboundedSender<Message>>>>;

/// A local websocket server standing in for the live mempool feed.
///
/// Every text frame a client sends is recorded, and tests push JSON frames to all
/// connected clients.
#[derive(Debug)]
pub struct MempoolSimulator {
    addr: SocketAddr,
    clients: Clients,
    received: Arc<Mutex<Vec<String>>>,
    join_handle: JoinHandle<()>,
}

impl MempoolSimulator {
    pub async fn new() -> Result<Self, MempoolSimulatorError> {
        tracing::info!("starting mempool simulator");

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let clients = Clients::default();
        let received = Arc::new(Mutex::new(Vec::new()));

        let clients_clone = clients.clone();
        let received_clone = received.clone();

        let join_handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let ws = match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(error) => {
                        tracing::error!("error accepting websocket connection: {}", error);
                        continue;
                    }
                };
                tokio::spawn(ws_connection(
                    ws,
                    clients_clone.clone(),
                    received_clone.clone(),
                ));
            }
        });

        Ok(Self {
            addr,
            clients,
            received,
            join_handle,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn client_count(&self) -> usize {
        self.clients
            .lock()
            .await
            .iter()
            .filter(|client| !client.is_closed())
            .count()
    }

    /// Sends a text frame to every connected client and returns how many received it.
    pub async fn push_text(&self, text: impl Into<String>) -> usize {
        let text = text.into();
        let mut clients = self.clients.lock().await;
        clients.retain(|client| !client.is_closed());
        clients
            .iter()
            .filter(|client| client.send(Message::Text(text.clone())).is_ok())
            .count()
    }

    pub async fn push_json(&self, value: &Value) -> usize {
        self.push_text(value.to_string()).await
    }

    /// Closes every open connection from the server side.
    pub async fn disconnect_all(&self) {
        for client in self.clients.lock().await.drain(..) {
            client.send(Message::Close(None)).ok();
        }
    }

    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    /// Waits until at least `count` clients are connected.
    pub async fn wait_for_clients(&self, count: usize) -> Result<(), MempoolSimulatorError> {
        wait_until("clients", move || async move { self.client_count().await >= count }).await
    }

    /// Waits until at least `count` text frames have been received from clients.
    pub async fn wait_for_received(&self, count: usize) -> Result<Vec<String>, MempoolSimulatorError> {
        wait_until("client messages", move || async move {
            self.received.lock().await.len() >= count
        })
        .await?;
        Ok(self.received().await)
    }
}

impl Drop for MempoolSimulator {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

async fn wait_until<F, Fut>(what: &'static str, mut done: F) -> Result<(), MempoolSimulatorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let poll = async {
        while !done().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    tokio::time::timeout(Duration::from_secs(5), poll)
        .await
        .map_err(|_| MempoolSimulatorError::Timeout(what))
}

async fn ws_connection(
    ws: WebSocketStream<TcpStream>,
    clients: Clients,
    received: Arc<Mutex<Vec<String>>>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    clients.lock().await.push(tx);

    let (mut sink, mut stream) = ws.split();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let closing = matches!(message, Message::Close(..));
            if let Err(error) = sink.send(message).await {
                tracing::debug!("error sending message to client: {}", error);
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => received.lock().await.push(text),
            Ok(Message::Close(..)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!("received error from stream: {:?}", error);
                break;
            }
        }
    }

    writer.abort();
}
