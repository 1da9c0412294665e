use std::time::{SystemTime, UNIX_EPOCH};

use dslab_types::{MempoolEvent, Txid};
use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    txid: Option<String>,
    fee: Option<f64>,
    weight: Option<f64>,
    vsize: Option<f64>,
    fee_rate: Option<f64>,
    effective_fee_per_vsize: Option<f64>,
    first_seen: Option<u64>,
    confirmed_in_block: Option<u32>,
    status: Option<WireStatus>,
}

#[derive(Deserialize, Debug)]
struct WireStatus {
    #[serde(default)]
    confirmed: bool,
    block_height: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct WireBlock {
    height: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct WireMessage {
    #[serde(flatten)]
    transaction: WireTransaction,
    #[serde(rename = "address-transactions", default)]
    address_transactions: Vec<WireTransaction>,
    #[serde(rename = "block-transactions", default)]
    block_transactions: Vec<WireTransaction>,
    block: Option<WireBlock>,
}

impl WireTransaction {
    fn fee_rate(&self) -> Option<f64> {
        if let Some(rate) = self.fee_rate.or(self.effective_fee_per_vsize) {
            return Some(rate);
        }

        let fee = self.fee?;
        let vsize = self
            .vsize
            .or_else(|| self.weight.map(|weight| weight / 4.0))
            .filter(|vsize| *vsize > 0.0)?;

        Some(fee / vsize)
    }

    fn into_event(self, block_height: Option<u32>, now: u64) -> Option<MempoolEvent> {
        let txid = self.txid.as_deref()?.parse::<Txid>().ok()?;
        let fee_rate = self.fee_rate();

        let confirmed_in_block = self
            .confirmed_in_block
            .or_else(|| {
                self.status
                    .as_ref()
                    .filter(|status| status.confirmed)
                    .and_then(|status| status.block_height)
            })
            .or(block_height);

        Some(MempoolEvent {
            txid,
            first_seen_at: self.first_seen.unwrap_or(now),
            fee_rate,
            confirmed_in_block,
        })
    }
}

/// Extracts every transaction sighting from one text frame of the feed.
///
/// Frames that are not JSON, or that carry no usable transaction id, yield nothing.
pub fn parse_message(text: &str) -> Vec<MempoolEvent> {
    parse_message_at(text, unix_now())
}

/// Like [`parse_message`], with `now` used for sightings that carry no timestamp.
pub fn parse_message_at(text: &str, now: u64) -> Vec<MempoolEvent> {
    let Ok(message) = serde_json::from_str::<WireMessage>(text) else {
        return Vec::new();
    };

    let block_height = message.block.and_then(|block| block.height);

    message
        .transaction
        .into_event(None, now)
        .into_iter()
        .chain(
            message
                .address_transactions
                .into_iter()
                .filter_map(|tx| tx.into_event(None, now)),
        )
        .chain(
            message
                .block_transactions
                .into_iter()
                .filter_map(|tx| tx.into_event(block_height, now)),
        )
        .collect()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
