mod address;
mod candidate;
mod error;
mod event;
mod identity;
mod network;
mod outcome;
mod params;
mod utxo;

pub use address::*;
pub use candidate::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use network::*;
pub use outcome::*;
pub use params::*;
pub use utxo::*;

pub use bitcoin::{OutPoint, Txid};
