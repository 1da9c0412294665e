mod fixtures;
mod mempool_simulator;

pub use fixtures::*;
pub use mempool_simulator::*;
