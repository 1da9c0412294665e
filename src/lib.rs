pub use dslab_mempool as mempool;
pub use dslab_service as service;
pub use dslab_session as session;
pub use dslab_types as types;

pub mod prelude;
