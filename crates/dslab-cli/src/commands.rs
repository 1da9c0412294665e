mod broadcast;
mod craft;
mod generate;
mod race;
mod utxos;
mod watch;

pub use broadcast::*;
pub use craft::*;
pub use generate::*;
pub use race::*;
pub use utxos::*;
pub use watch::*;
