use dslab_types::{Network, TxCandidate, Txid, Utxo};
use serde::{Deserialize, Serialize};

/// Every endpoint answers with either its payload or `{ "error": "..." }`.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Failure { error: String },
    Success(T),
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Failure { error } => Err(error),
            Self::Success(value) => Ok(value),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DoubleSpendRequest<'a> {
    pub wif: &'a str,
    pub utxo: &'a Utxo,
    pub output_address1: &'a str,
    pub output_address2: &'a str,
    pub fee_rate: u64,
    pub net: Network,
    #[serde(rename = "enableRBF")]
    pub enable_rbf: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DoubleSpendResponse {
    pub tx1: TxCandidate,
    pub tx2: TxCandidate,
}

#[derive(Serialize, Debug, Clone)]
pub struct BroadcastRequest<'a> {
    pub hex: &'a str,
    pub net: Network,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct BroadcastResponse {
    pub txid: Txid,
}
