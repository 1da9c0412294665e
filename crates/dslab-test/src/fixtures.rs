use std::str::FromStr;

use bitcoin::{
    absolute::LockTime, consensus::encode::serialize_hex, transaction::Version, Amount, OutPoint,
    ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use dslab_types::{TxCandidate, Utxo};

pub const TESTNET_ADDRESS_A: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
pub const TESTNET_ADDRESS_B: &str =
    "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";
pub const MAINNET_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
pub const TEST_WIF: &str = "cTestOnlyNotARealKeyxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

/// A txid made of one repeated hex digit, e.g. `txid('a')` is `aaaa…aaaa`.
pub fn txid(digit: char) -> Txid {
    Txid::from_str(&digit.to_string().repeat(64)).expect("digit must be hex")
}

pub fn outpoint(digit: char, vout: u32) -> OutPoint {
    OutPoint::new(txid(digit), vout)
}

pub fn utxo(digit: char, vout: u32, value: u64) -> Utxo {
    Utxo::new(txid(digit), vout, value)
}

/// An unsigned one-in, one-out transaction spending `input`.
///
/// Different `value`s give different txids for the same input.
pub fn spend_transaction(input: OutPoint, value: u64) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: input,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

pub fn candidate(transaction: &Transaction) -> TxCandidate {
    TxCandidate {
        txid: transaction.compute_txid(),
        hex: serialize_hex(transaction),
    }
}

/// A candidate pair spending `input`, shaped like the crafting service's response body.
pub fn double_spend_response(input: OutPoint) -> (TxCandidate, TxCandidate, String) {
    let tx1 = candidate(&spend_transaction(input, 99_000));
    let tx2 = candidate(&spend_transaction(input, 98_500));
    let body = serde_json::json!({ "tx1": tx1, "tx2": tx2 }).to_string();
    (tx1, tx2, body)
}

#[cfg(test)]
mod tests {
    use bitcoin::consensus;

    use super::*;

    #[test]
    fn test_candidate_round_trips_through_hex() {
        let transaction = spend_transaction(outpoint('a', 0), 1_000);
        let candidate = candidate(&transaction);

        let bytes = hex::decode(&candidate.hex).unwrap();
        let decoded: Transaction = consensus::deserialize(&bytes).unwrap();
        assert_eq!(decoded.compute_txid(), candidate.txid);
        assert_eq!(decoded.input[0].previous_output, outpoint('a', 0));
    }

    #[test]
    fn test_distinct_values_distinct_txids() {
        let (tx1, tx2, _) = double_spend_response(outpoint('a', 0));
        assert_ne!(tx1.txid, tx2.txid);
    }
}
