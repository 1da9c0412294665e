use std::fmt;

use dslab_types::{BroadcastOutcome, CandidatePair, CraftParams, Identity, OutPoint, Slot, Txid, Utxo};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::InvalidState;

/// Where a session is in the generate, fund, craft, race, observe sequence.
///
/// Derived from what the store holds rather than tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Empty,
    HasIdentity,
    HasUtxo,
    HasCandidatePair,
    Racing,
    Settled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::HasIdentity => "has identity",
            Self::HasUtxo => "has UTXO",
            Self::HasCandidatePair => "has candidate pair",
            Self::Racing => "racing",
            Self::Settled => "settled",
        };
        f.write_str(name)
    }
}

/// Why a race stopped being observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettleReason {
    /// Both candidates are confirmed or rejected.
    BothTerminal,
    /// The observation window elapsed first.
    TimedOut,
    /// The mempool feed ended, or was never available.
    StreamClosed,
}

impl fmt::Display for SettleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BothTerminal => f.write_str("both candidates reached a final outcome"),
            Self::TimedOut => f.write_str("observation timed out"),
            Self::StreamClosed => f.write_str("mempool stream closed"),
        }
    }
}

/// What is known about one candidate of the pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateStatus {
    pub outcome: BroadcastOutcome,
    /// The last failure or anomaly seen for this candidate.
    pub note: Option<String>,
}

/// A single mutation of the store. Signing material never appears here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    IdentityChanged { address: String },
    UtxoSelected(Option<Utxo>),
    DestinationsChanged { dest_a: String, dest_b: String },
    FeeRateChanged(u64),
    RbfChanged(bool),
    PairSet { input: OutPoint, a: Txid, b: Txid },
    PairCleared,
    OutcomeChanged { slot: Slot, outcome: BroadcastOutcome },
    Annotated { slot: Slot, message: String },
    Settled(SettleReason),
}

/// Holds the session and decides which mutations are legal.
///
/// Every accepted mutation is published to subscribers as a [`SessionChange`].
#[derive(Debug)]
pub struct SessionStore {
    identity: Option<Identity>,
    utxo: Option<Utxo>,
    destinations: Option<(String, String)>,
    fee_rate: Option<u64>,
    rbf: bool,
    pair: Option<CandidatePair>,
    candidates: [CandidateStatus; 2],
    settled: Option<SettleReason>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);

        Self {
            identity: None,
            utxo: None,
            destinations: None,
            fee_rate: None,
            rbf: false,
            pair: None,
            candidates: Default::default(),
            settled: None,
            changes,
        }
    }

    /// Receives every change made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    pub fn state(&self) -> SessionState {
        if self.pair.is_some() {
            if self.settled.is_some() {
                SessionState::Settled
            } else if self
                .candidates
                .iter()
                .any(|status| status.outcome != BroadcastOutcome::NotSent)
            {
                SessionState::Racing
            } else {
                SessionState::HasCandidatePair
            }
        } else if self.utxo.is_some() {
            SessionState::HasUtxo
        } else if self.identity.is_some() {
            SessionState::HasIdentity
        } else {
            SessionState::Empty
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn address(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.address.as_str())
    }

    pub fn utxo(&self) -> Option<&Utxo> {
        self.utxo.as_ref()
    }

    pub fn destinations(&self) -> Option<(&str, &str)> {
        self.destinations
            .as_ref()
            .map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn fee_rate(&self) -> Option<u64> {
        self.fee_rate
    }

    pub fn rbf(&self) -> bool {
        self.rbf
    }

    pub fn pair(&self) -> Option<&CandidatePair> {
        self.pair.as_ref()
    }

    pub fn candidate(&self, slot: Slot) -> &CandidateStatus {
        &self.candidates[slot.index()]
    }

    pub fn outcome(&self, slot: Slot) -> &BroadcastOutcome {
        &self.candidates[slot.index()].outcome
    }

    pub fn settle_reason(&self) -> Option<SettleReason> {
        self.settled
    }

    pub fn both_terminal(&self) -> bool {
        self.candidates
            .iter()
            .all(|status| status.outcome.is_terminal())
    }

    /// The complete crafting parameters, once destinations and a fee rate are set.
    pub fn craft_params(&self) -> Option<CraftParams> {
        let (dest_a, dest_b) = self.destinations.clone()?;

        Some(CraftParams {
            dest_a,
            dest_b,
            fee_rate: self.fee_rate?,
            rbf: self.rbf,
        })
    }

    /// Replaces the identity. The selected UTXO, the pair and all outcomes go with the old one.
    pub fn set_identity(&mut self, identity: Identity) {
        info!("Session identity is now {}", identity.address);

        let address = identity.address.clone();
        self.identity = Some(identity);
        self.publish(SessionChange::IdentityChanged { address });

        if self.utxo.take().is_some() {
            self.publish(SessionChange::UtxoSelected(None));
        }
        self.discard_pair();
    }

    pub fn select_utxo(&mut self, utxo: Utxo) -> Result<(), InvalidState> {
        if self.identity.is_none() {
            return Err(InvalidState::new("select a UTXO", "no identity"));
        }

        debug!("Selected UTXO {utxo}");

        self.discard_pair();
        self.utxo = Some(utxo);
        self.publish(SessionChange::UtxoSelected(Some(utxo)));

        Ok(())
    }

    pub fn clear_utxo(&mut self) {
        self.discard_pair();

        if self.utxo.take().is_some() {
            self.publish(SessionChange::UtxoSelected(None));
        }
    }

    pub fn set_destinations(&mut self, dest_a: impl Into<String>, dest_b: impl Into<String>) {
        let destinations = (dest_a.into(), dest_b.into());
        if self.destinations.as_ref() == Some(&destinations) {
            return;
        }

        self.discard_pair();

        let (dest_a, dest_b) = destinations.clone();
        self.destinations = Some(destinations);
        self.publish(SessionChange::DestinationsChanged { dest_a, dest_b });
    }

    pub fn set_fee_rate(&mut self, fee_rate: u64) {
        if self.fee_rate == Some(fee_rate) {
            return;
        }

        self.discard_pair();
        self.fee_rate = Some(fee_rate);
        self.publish(SessionChange::FeeRateChanged(fee_rate));
    }

    pub fn set_rbf(&mut self, rbf: bool) {
        if self.rbf == rbf {
            return;
        }

        self.discard_pair();
        self.rbf = rbf;
        self.publish(SessionChange::RbfChanged(rbf));
    }

    /// Accepts a pair for the selected UTXO. Outcomes start again from not sent.
    pub fn set_candidate_pair(&mut self, pair: CandidatePair) -> Result<(), InvalidState> {
        let Some(utxo) = self.utxo else {
            return Err(InvalidState::new("accept a candidate pair", "no UTXO selected"));
        };

        if self.craft_params().is_none() {
            return Err(InvalidState::new(
                "accept a candidate pair",
                "destinations or fee rate not set",
            ));
        }

        if pair.input() != utxo.outpoint() {
            return Err(InvalidState::new(
                "accept a candidate pair",
                format!("pair spends {} but {} is selected", pair.input(), utxo.outpoint()),
            ));
        }

        self.discard_pair();

        info!(
            "Candidate pair ready: TX-A {} and TX-B {} both spend {}",
            pair.a().txid,
            pair.b().txid,
            pair.input()
        );

        self.publish(SessionChange::PairSet {
            input: pair.input(),
            a: pair.a().txid,
            b: pair.b().txid,
        });
        self.pair = Some(pair);

        Ok(())
    }

    /// Drops the pair along with its outcomes. Returns whether there was one.
    pub fn clear_candidate_pair(&mut self) -> bool {
        self.discard_pair()
    }

    /// Moves a candidate's outcome forward. Returns `false` if the outcome would not advance.
    pub fn record_broadcast_outcome(
        &mut self,
        slot: Slot,
        outcome: BroadcastOutcome,
    ) -> Result<bool, InvalidState> {
        if self.pair.is_none() {
            return Err(InvalidState::new("record an outcome", "no candidate pair"));
        }

        let current = &mut self.candidates[slot.index()].outcome;
        if !current.advance(outcome.clone()) {
            debug!("Ignoring {slot} outcome {outcome}, already {current}");
            return Ok(false);
        }

        info!("{slot} is now {outcome}");
        self.publish(SessionChange::OutcomeChanged { slot, outcome });

        Ok(true)
    }

    pub fn annotate(&mut self, slot: Slot, message: impl Into<String>) -> Result<(), InvalidState> {
        if self.pair.is_none() {
            return Err(InvalidState::new("annotate a candidate", "no candidate pair"));
        }

        let message = message.into();
        self.candidates[slot.index()].note = Some(message.clone());
        self.publish(SessionChange::Annotated { slot, message });

        Ok(())
    }

    /// Ends the race. Returns `false` if it had already been settled.
    pub fn settle(&mut self, reason: SettleReason) -> Result<bool, InvalidState> {
        match self.state() {
            SessionState::Racing => {}
            SessionState::Settled => return Ok(false),
            state => {
                return Err(InvalidState::new("settle", format!("session is {state}")));
            }
        }

        info!("Race settled: {reason}");

        self.settled = Some(reason);
        self.publish(SessionChange::Settled(reason));

        Ok(true)
    }

    fn discard_pair(&mut self) -> bool {
        self.candidates = Default::default();
        self.settled = None;

        if self.pair.take().is_some() {
            self.publish(SessionChange::PairCleared);
            true
        } else {
            false
        }
    }

    fn publish(&self, change: SessionChange) {
        // No subscribers is fine.
        self.changes.send(change).ok();
    }
}

#[cfg(test)]
mod tests {
    use dslab_test::{candidate, outpoint, spend_transaction, utxo, TESTNET_ADDRESS_A, TESTNET_ADDRESS_B};
    use dslab_types::Wif;

    use super::*;

    fn identity() -> Identity {
        Identity::new(TESTNET_ADDRESS_A, Wif::new("cTestKey"))
    }

    fn pair_for(input: OutPoint) -> CandidatePair {
        CandidatePair::new(
            input,
            candidate(&spend_transaction(input, 99_000)),
            candidate(&spend_transaction(input, 98_500)),
        )
    }

    fn ready_store() -> SessionStore {
        let mut store = SessionStore::new();
        store.set_identity(identity());
        store.set_destinations(TESTNET_ADDRESS_A, TESTNET_ADDRESS_B);
        store.set_fee_rate(3);
        store.select_utxo(utxo('a', 0, 100_000)).unwrap();
        store
    }

    #[test]
    fn test_state_progression() {
        let mut store = SessionStore::new();
        assert_eq!(store.state(), SessionState::Empty);

        store.set_identity(identity());
        assert_eq!(store.state(), SessionState::HasIdentity);

        store.set_destinations(TESTNET_ADDRESS_A, TESTNET_ADDRESS_B);
        store.set_fee_rate(3);
        store.select_utxo(utxo('a', 0, 100_000)).unwrap();
        assert_eq!(store.state(), SessionState::HasUtxo);

        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();
        assert_eq!(store.state(), SessionState::HasCandidatePair);

        store
            .record_broadcast_outcome(Slot::A, BroadcastOutcome::Sent)
            .unwrap();
        assert_eq!(store.state(), SessionState::Racing);

        assert!(store.settle(SettleReason::TimedOut).unwrap());
        assert_eq!(store.state(), SessionState::Settled);
        assert!(!store.settle(SettleReason::BothTerminal).unwrap());
        assert_eq!(store.settle_reason(), Some(SettleReason::TimedOut));
    }

    #[test]
    fn test_select_utxo_requires_identity() {
        let mut store = SessionStore::new();
        assert!(store.select_utxo(utxo('a', 0, 1)).is_err());
    }

    #[test]
    fn test_pair_requires_utxo_and_params() {
        let mut store = SessionStore::new();
        store.set_identity(identity());
        assert!(store.set_candidate_pair(pair_for(outpoint('a', 0))).is_err());

        store.select_utxo(utxo('a', 0, 100_000)).unwrap();
        let error = store
            .set_candidate_pair(pair_for(outpoint('a', 0)))
            .unwrap_err();
        assert_eq!(error.reason, "destinations or fee rate not set");
    }

    #[test]
    fn test_pair_must_spend_selected_utxo() {
        let mut store = ready_store();
        assert!(store.set_candidate_pair(pair_for(outpoint('b', 1))).is_err());
        assert_eq!(store.state(), SessionState::HasUtxo);
    }

    #[test]
    fn test_reselecting_utxo_clears_pair() {
        let mut store = ready_store();
        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();

        store.select_utxo(utxo('a', 0, 100_000)).unwrap();
        assert!(store.pair().is_none());
        assert_eq!(store.state(), SessionState::HasUtxo);
    }

    #[test]
    fn test_parameter_changes_clear_pair() {
        let mut store = ready_store();

        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();
        store.set_fee_rate(3);
        assert!(store.pair().is_some(), "unchanged fee rate keeps the pair");
        store.set_fee_rate(5);
        assert!(store.pair().is_none());

        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();
        store.set_rbf(true);
        assert!(store.pair().is_none());

        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();
        store.set_destinations(TESTNET_ADDRESS_B, TESTNET_ADDRESS_A);
        assert!(store.pair().is_none());
        assert_eq!(store.craft_params().map(|params| params.fee_rate), Some(5));
    }

    #[test]
    fn test_new_identity_clears_downstream() {
        let mut store = ready_store();
        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();
        store
            .record_broadcast_outcome(Slot::B, BroadcastOutcome::Sent)
            .unwrap();

        store.set_identity(identity());
        assert_eq!(store.state(), SessionState::HasIdentity);
        assert!(store.utxo().is_none());
        assert_eq!(store.outcome(Slot::B), &BroadcastOutcome::NotSent);
        assert!(store.craft_params().is_some());
    }

    #[test]
    fn test_outcomes_require_pair_and_only_advance() {
        let mut store = ready_store();
        assert!(store
            .record_broadcast_outcome(Slot::A, BroadcastOutcome::Sent)
            .is_err());

        store.set_candidate_pair(pair_for(outpoint('a', 0))).unwrap();
        assert!(store
            .record_broadcast_outcome(Slot::A, BroadcastOutcome::ObservedConfirmed { block: 1 })
            .unwrap());
        assert!(!store
            .record_broadcast_outcome(Slot::A, BroadcastOutcome::ObservedInMempool)
            .unwrap());
        assert_eq!(store.outcome(Slot::B), &BroadcastOutcome::NotSent);
    }

    #[test]
    fn test_changes_are_published_without_wif() {
        let mut store = SessionStore::new();
        let mut changes = store.subscribe();

        store.set_identity(identity());
        store.set_fee_rate(7);

        assert_eq!(
            changes.try_recv().unwrap(),
            SessionChange::IdentityChanged {
                address: TESTNET_ADDRESS_A.to_string()
            }
        );
        assert_eq!(changes.try_recv().unwrap(), SessionChange::FeeRateChanged(7));
        assert!(changes.try_recv().is_err());
    }
}
