use std::fmt;

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};

/// An unspent output as reported by the UTXO listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
}

impl Utxo {
    pub fn new(txid: Txid, vout: u32, value: u64) -> Self {
        Self { txid, vout, value }
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

impl fmt::Display for Utxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({} sats)", self.txid, self.vout, self.value)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_utxo_listing_json() {
        let utxos: Vec<Utxo> = serde_json::from_str(
            r#"[{"txid": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "vout": 0, "value": 100000}]"#,
        )
        .unwrap();

        assert_eq!(utxos.len(), 1);
        assert_eq!(
            utxos[0].outpoint(),
            OutPoint::new(Txid::from_str(&"a".repeat(64)).unwrap(), 0)
        );
        assert_eq!(utxos[0].value, 100_000);
    }
}
