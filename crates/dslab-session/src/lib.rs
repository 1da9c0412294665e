mod config;
mod error;
mod orchestrator;
mod reconciler;
mod store;

pub use config::*;
pub use error::*;
pub use orchestrator::*;
pub use reconciler::*;
pub use store::*;
