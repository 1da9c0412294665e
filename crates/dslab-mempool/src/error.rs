use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("event source is unavailable: {0}")]
    Unavailable(String),
}
