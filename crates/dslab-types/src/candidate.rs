use std::fmt;

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};

/// Which of the two conflicting transactions is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::A, Slot::B];

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("TX-A"),
            Self::B => f.write_str("TX-B"),
        }
    }
}

/// A signed transaction ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxCandidate {
    pub txid: Txid,
    pub hex: String,
}

/// Two signed transactions that spend the same outpoint to different places.
///
/// Serializes to the same `{ tx1, tx2 }` shape the crafting service returns,
/// plus the shared input, so it can be shown or saved as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidatePair {
    input: OutPoint,
    #[serde(rename = "tx1")]
    a: TxCandidate,
    #[serde(rename = "tx2")]
    b: TxCandidate,
}

impl CandidatePair {
    /// Callers are expected to have checked that both transactions spend `input`.
    pub fn new(input: OutPoint, a: TxCandidate, b: TxCandidate) -> Self {
        Self { input, a, b }
    }

    pub fn input(&self) -> OutPoint {
        self.input
    }

    pub fn get(&self, slot: Slot) -> &TxCandidate {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn a(&self) -> &TxCandidate {
        &self.a
    }

    pub fn b(&self) -> &TxCandidate {
        &self.b
    }

    pub fn slot_of(&self, txid: &Txid) -> Option<Slot> {
        Slot::BOTH
            .into_iter()
            .find(|slot| &self.get(*slot).txid == txid)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn txid(c: char) -> Txid {
        Txid::from_str(&c.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn test_slot_lookup() {
        let pair = CandidatePair::new(
            OutPoint::new(txid('a'), 0),
            TxCandidate {
                txid: txid('1'),
                hex: "00".to_string(),
            },
            TxCandidate {
                txid: txid('2'),
                hex: "00".to_string(),
            },
        );

        assert_eq!(pair.slot_of(&txid('1')), Some(Slot::A));
        assert_eq!(pair.slot_of(&txid('2')), Some(Slot::B));
        assert_eq!(pair.slot_of(&txid('3')), None);
        assert_eq!(Slot::A.other(), Slot::B);
    }

    #[test]
    fn test_pair_export_shape() {
        let pair = CandidatePair::new(
            OutPoint::new(txid('a'), 1),
            TxCandidate {
                txid: txid('1'),
                hex: "aa".to_string(),
            },
            TxCandidate {
                txid: txid('2'),
                hex: "bb".to_string(),
            },
        );

        let value = serde_json::to_value(&pair).unwrap();
        assert_eq!(value["tx1"]["hex"], "aa");
        assert_eq!(value["tx2"]["txid"], "2".repeat(64));
    }
}
