mod error;
mod http_client;
mod mock_client;
mod models;
mod tx_service;
mod verify;

pub use error::*;
pub use http_client::*;
pub use mock_client::*;
pub use models::*;
pub use tx_service::*;
pub use verify::*;
