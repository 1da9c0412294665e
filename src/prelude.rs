pub use dslab_types::{
    BroadcastOutcome, CandidatePair, CraftParams, ErrorKind, Identity, MempoolEvent, Network,
    OutPoint, Slot, TxCandidate, Txid, Utxo, ValidationError, Wif,
};

pub use dslab_mempool::{
    ChannelSource, Epoch, EventSource, StreamEndpoints, StreamOptions, SubscribeRequest,
    WebSocketSource,
};
pub use dslab_service::{HttpTxService, ServiceError, TxService};
pub use dslab_session::{
    LabConfig, Orchestrator, SessionChange, SessionError, SessionState, SettleReason,
};
