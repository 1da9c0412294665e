mod endpoints;
mod error;
mod event_source;
mod message;
mod stream;
mod subscription;

pub use endpoints::*;
pub use error::*;
pub use event_source::*;
pub use message::*;
pub use stream::*;
pub use subscription::*;
