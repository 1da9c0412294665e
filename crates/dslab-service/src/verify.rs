use bitcoin::{consensus, OutPoint, Transaction};
use dslab_types::{CandidatePair, Slot, TxCandidate};

use crate::{ProtocolViolation, ServiceError};

/// Decodes both raw transactions and checks that they really are a double-spend of `input`.
pub fn verify_conflicting_pair(
    input: OutPoint,
    a: TxCandidate,
    b: TxCandidate,
) -> Result<CandidatePair, ServiceError> {
    verify_candidate(Slot::A, &a, input)?;
    verify_candidate(Slot::B, &b, input)?;

    if a.txid == b.txid {
        return Err(ProtocolViolation::IdenticalCandidates(a.txid).into());
    }

    Ok(CandidatePair::new(input, a, b))
}

fn verify_candidate(
    slot: Slot,
    candidate: &TxCandidate,
    input: OutPoint,
) -> Result<(), ServiceError> {
    let transaction = decode_transaction(slot, &candidate.hex)?;

    if !transaction
        .input
        .iter()
        .any(|txin| txin.previous_output == input)
    {
        return Err(ProtocolViolation::InputMismatch {
            slot,
            expected: input,
            found: transaction
                .input
                .iter()
                .map(|txin| txin.previous_output)
                .collect(),
        }
        .into());
    }

    let computed = transaction.compute_txid();

    if computed != candidate.txid {
        return Err(ProtocolViolation::TxidMismatch {
            slot,
            reported: candidate.txid,
            computed,
        }
        .into());
    }

    Ok(())
}

fn decode_transaction(slot: Slot, raw: &str) -> Result<Transaction, ServiceError> {
    let bytes = hex::decode(raw.trim())
        .map_err(|error| ServiceError::Malformed(format!("{slot} is not valid hex: {error}")))?;

    consensus::deserialize(&bytes).map_err(|error| {
        ServiceError::Malformed(format!("{slot} is not a valid transaction: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use dslab_test::{candidate, outpoint, spend_transaction};

    use super::*;

    #[test]
    fn test_accepts_double_spend() {
        let input = outpoint('a', 0);
        let a = candidate(&spend_transaction(input, 99_000));
        let b = candidate(&spend_transaction(input, 98_000));

        let pair = verify_conflicting_pair(input, a.clone(), b.clone()).unwrap();
        assert_eq!(pair.input(), input);
        assert_eq!(pair.a(), &a);
        assert_eq!(pair.b(), &b);
    }

    #[test]
    fn test_rejects_different_inputs() {
        let a = candidate(&spend_transaction(outpoint('a', 0), 99_000));
        let b = candidate(&spend_transaction(outpoint('b', 1), 98_000));

        let error = verify_conflicting_pair(outpoint('a', 0), a, b).unwrap_err();
        assert!(matches!(
            error,
            ServiceError::ProtocolViolation(ProtocolViolation::InputMismatch { slot: Slot::B, .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_txid() {
        let input = outpoint('a', 0);
        let mut a = candidate(&spend_transaction(input, 99_000));
        let b = candidate(&spend_transaction(input, 98_000));
        a.txid = b.txid;

        let error = verify_conflicting_pair(input, a, b).unwrap_err();
        assert!(matches!(
            error,
            ServiceError::ProtocolViolation(ProtocolViolation::TxidMismatch { slot: Slot::A, .. })
        ));
    }

    #[test]
    fn test_rejects_identical_candidates() {
        let input = outpoint('a', 0);
        let a = candidate(&spend_transaction(input, 99_000));

        let error = verify_conflicting_pair(input, a.clone(), a).unwrap_err();
        assert!(matches!(
            error,
            ServiceError::ProtocolViolation(ProtocolViolation::IdenticalCandidates(..))
        ));
    }

    #[test]
    fn test_rejects_garbage_hex() {
        let input = outpoint('a', 0);
        let mut a = candidate(&spend_transaction(input, 99_000));
        a.hex = "zz".to_string();
        let b = candidate(&spend_transaction(input, 98_000));

        let error = verify_conflicting_pair(input, a, b).unwrap_err();
        assert!(matches!(error, ServiceError::Malformed(..)));
    }
}
