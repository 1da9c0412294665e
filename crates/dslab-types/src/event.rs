use bitcoin::Txid;
use serde::Serialize;

use crate::BroadcastOutcome;

/// A transaction sighting from the live mempool feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MempoolEvent {
    pub txid: Txid,
    /// Unix timestamp in seconds.
    pub first_seen_at: u64,
    /// Sat/vB, when the feed carried enough to compute it.
    pub fee_rate: Option<f64>,
    pub confirmed_in_block: Option<u32>,
}

impl MempoolEvent {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_in_block.is_some()
    }

    /// The outcome this sighting implies for a candidate with the same txid.
    pub fn observed_outcome(&self) -> BroadcastOutcome {
        match self.confirmed_in_block {
            Some(block) => BroadcastOutcome::ObservedConfirmed { block },
            None => BroadcastOutcome::ObservedInMempool,
        }
    }
}
