use std::{collections::VecDeque, future::Future, time::Duration};

use dslab_mempool::{Epoch, EpochEvent, EventSource};
use dslab_service::{ServiceError, TxService};
use dslab_types::{
    validate_address, BroadcastOutcome, CandidatePair, ErrorKind, Identity, MempoolEvent, Network,
    Slot, Txid, Utxo, ValidationError, Wif,
};
use tokio::{sync::broadcast, time::Instant};
use tracing::{info, instrument, warn};

use crate::{
    InvalidState, LabConfig, Reconciled, Reconciler, SessionChange, SessionError, SessionState,
    SessionStore, SettleReason,
};

/// The result of racing both candidates, one entry per slot.
#[derive(Debug)]
pub struct BroadcastReport {
    pub a: Result<Txid, ServiceError>,
    pub b: Result<Txid, ServiceError>,
}

impl BroadcastReport {
    pub fn get(&self, slot: Slot) -> &Result<Txid, ServiceError> {
        match slot {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn all_accepted(&self) -> bool {
        self.a.is_ok() && self.b.is_ok()
    }
}

/// Drives one double-spend session from identity to a settled race.
///
/// The orchestrator is the only writer to its [`SessionStore`]. Remote failures are
/// returned to the caller and never move the session backwards.
#[derive(Debug)]
pub struct Orchestrator<C, S> {
    service: C,
    reconciler: Reconciler<S>,
    store: SessionStore,
    config: LabConfig,
    network: Network,
    utxos: Vec<Utxo>,
}

impl<C, S> Orchestrator<C, S>
where
    C: TxService,
    S: EventSource,
{
    pub fn new(service: C, source: S, config: LabConfig) -> Self {
        let mut store = SessionStore::new();
        store.set_fee_rate(config.default_fee_rate);

        Self {
            service,
            reconciler: Reconciler::new(source, config.mempool_log_capacity),
            store,
            network: config.network,
            config,
            utxos: Vec::new(),
        }
    }

    pub fn service(&self) -> &C {
        &self.service
    }

    pub fn source(&self) -> &S {
        self.reconciler.source()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<SessionChange> {
        self.store.subscribe()
    }

    /// The last UTXO listing, as loaded by [`Orchestrator::load_utxos`].
    pub fn utxos(&self) -> &[Utxo] {
        &self.utxos
    }

    pub fn mempool_log(&self) -> &VecDeque<MempoolEvent> {
        self.reconciler.log()
    }

    pub fn epoch(&self) -> Epoch {
        self.reconciler.epoch()
    }

    pub fn is_observing(&self) -> bool {
        self.reconciler.is_subscribed()
    }

    /// Asks the service for a fresh identity and makes it the session identity.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn generate_identity(&mut self) -> Result<&Identity, SessionError> {
        let identity = bounded(
            self.config.request_timeout,
            self.service.generate_identity(self.network),
        )
        .await?;

        self.activate(identity).await;
        self.identity()
    }

    /// Uses an existing address and key as the session identity.
    pub async fn import_identity(
        &mut self,
        address: impl Into<String>,
        wif: Wif,
    ) -> Result<&Identity, SessionError> {
        let address = address.into();

        if address.trim().is_empty() {
            return Err(ValidationError::Missing("address").into());
        }
        if wif.is_empty() {
            return Err(ValidationError::Missing("signing key").into());
        }
        validate_address(&address, self.network)?;

        self.activate(Identity::new(address, wif)).await;
        self.identity()
    }

    /// Switches network. The UTXO listing and selection belong to the old network and are
    /// dropped; the feed is reopened on the new network's endpoint.
    pub async fn set_network(&mut self, network: Network) {
        if self.network == network {
            return;
        }

        info!("Switching network from {} to {network}", self.network);

        self.network = network;
        self.utxos.clear();
        self.store.clear_utxo();
        self.open_stream().await;
    }

    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn load_utxos(&mut self) -> Result<&[Utxo], SessionError> {
        let Some(address) = self.store.address() else {
            return Err(InvalidState::new("load UTXOs", "no identity").into());
        };

        let utxos = bounded(
            self.config.request_timeout,
            self.service.list_utxos(address, self.network),
        )
        .await?;

        info!("Loaded {} UTXOs", utxos.len());

        self.utxos = utxos;
        Ok(&self.utxos)
    }

    pub fn select_utxo(&mut self, utxo: Utxo) -> Result<(), SessionError> {
        self.store.select_utxo(utxo)?;
        Ok(())
    }

    /// Selects the UTXO at `index` in the last listing.
    pub fn select_utxo_at(&mut self, index: usize) -> Result<Utxo, SessionError> {
        let Some(utxo) = self.utxos.get(index).copied() else {
            return Err(ValidationError::UtxoIndexOutOfRange {
                index,
                len: self.utxos.len(),
            }
            .into());
        };

        self.store.select_utxo(utxo)?;
        Ok(utxo)
    }

    pub fn set_destinations(
        &mut self,
        dest_a: impl Into<String>,
        dest_b: impl Into<String>,
    ) -> Result<(), SessionError> {
        let (dest_a, dest_b) = (dest_a.into(), dest_b.into());
        validate_address(&dest_a, self.network)?;
        validate_address(&dest_b, self.network)?;

        self.store.set_destinations(dest_a, dest_b);
        Ok(())
    }

    pub fn set_fee_rate(&mut self, fee_rate: u64) -> Result<(), SessionError> {
        if fee_rate == 0 {
            return Err(ValidationError::ZeroFeeRate.into());
        }

        self.store.set_fee_rate(fee_rate);
        Ok(())
    }

    pub fn set_rbf(&mut self, rbf: bool) {
        self.store.set_rbf(rbf);
    }

    /// Has the service build and sign two transactions spending the selected UTXO.
    ///
    /// A pair that breaks the double-spend contract is discarded and reported as a
    /// protocol violation.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn craft_pair(&mut self) -> Result<&CandidatePair, SessionError> {
        const OPERATION: &str = "craft a pair";

        match self.store.state() {
            SessionState::HasUtxo | SessionState::HasCandidatePair => {}
            SessionState::Empty | SessionState::HasIdentity => {
                return Err(InvalidState::new(OPERATION, "no UTXO selected").into());
            }
            state @ (SessionState::Racing | SessionState::Settled) => {
                return Err(InvalidState::new(OPERATION, format!("session is {state}")).into());
            }
        }

        let (Some(identity), Some(utxo)) = (self.store.identity(), self.store.utxo()) else {
            return Err(InvalidState::new(OPERATION, "no UTXO selected").into());
        };
        let Some(params) = self.store.craft_params() else {
            return Err(InvalidState::new(OPERATION, "destinations or fee rate not set").into());
        };

        let result = bounded(
            self.config.request_timeout,
            self.service.craft_pair(identity, utxo, &params, self.network),
        )
        .await;

        let pair = match result {
            Ok(pair) => pair,
            Err(error) => {
                if error.kind() == ErrorKind::ProtocolViolation {
                    warn!("Discarding candidate pair: {error}");
                    self.store.clear_candidate_pair();
                }
                return Err(error.into());
            }
        };

        self.store.set_candidate_pair(pair)?;
        self.pair()
    }

    /// Broadcasts both candidates concurrently and enters the race whatever the results.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn broadcast_both(&mut self) -> Result<BroadcastReport, SessionError> {
        const OPERATION: &str = "broadcast both candidates";

        let Some(pair) = self.store.pair().cloned() else {
            return Err(InvalidState::new(OPERATION, "no candidate pair").into());
        };
        if self.store.state() != SessionState::HasCandidatePair {
            return Err(
                InvalidState::new(OPERATION, "a candidate has already been broadcast").into(),
            );
        }

        for slot in Slot::BOTH {
            self.store
                .record_broadcast_outcome(slot, BroadcastOutcome::Sent)?;
        }

        let limit = self.config.request_timeout;
        let (a, b) = tokio::join!(
            bounded(limit, self.service.broadcast(&pair.a().hex, self.network)),
            bounded(limit, self.service.broadcast(&pair.b().hex, self.network)),
        );

        let report = BroadcastReport { a, b };
        for slot in Slot::BOTH {
            self.apply_broadcast(&pair, slot, report.get(slot))?;
        }

        Ok(report)
    }

    /// Broadcasts a single candidate that has not been sent yet.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn broadcast_one(&mut self, slot: Slot) -> Result<Txid, SessionError> {
        const OPERATION: &str = "broadcast a candidate";

        let Some(pair) = self.store.pair().cloned() else {
            return Err(InvalidState::new(OPERATION, "no candidate pair").into());
        };
        if self.store.outcome(slot) != &BroadcastOutcome::NotSent {
            return Err(InvalidState::new(OPERATION, format!("{slot} was already sent")).into());
        }
        if self.store.state() == SessionState::Settled {
            return Err(InvalidState::new(OPERATION, "the race is settled").into());
        }

        self.store
            .record_broadcast_outcome(slot, BroadcastOutcome::Sent)?;

        let result = bounded(
            self.config.request_timeout,
            self.service.broadcast(&pair.get(slot).hex, self.network),
        )
        .await;

        self.apply_broadcast(&pair, slot, &result)?;
        result.map_err(SessionError::from)
    }

    /// Feeds one mempool event through reconciliation, settling the race once both
    /// candidates are final.
    pub fn handle_event(&mut self, event: EpochEvent) -> Reconciled {
        let reconciled = self.reconciler.reconcile(&mut self.store, event);
        self.settle_if_final();
        reconciled
    }

    /// Reconciles every event that has already arrived, without waiting.
    pub fn poll_events(&mut self) -> usize {
        let mut count = 0;

        while let Some(event) = self.reconciler.try_next() {
            self.handle_event(event);
            count += 1;
        }

        count
    }

    /// Watches the feed until the race settles, using the configured observation timeout.
    pub async fn observe(&mut self) -> Result<SettleReason, SessionError> {
        self.observe_for(self.config.observation_timeout).await
    }

    pub async fn observe_for(&mut self, limit: Duration) -> Result<SettleReason, SessionError> {
        match self.store.state() {
            SessionState::Racing => {}
            SessionState::Settled => {
                if let Some(reason) = self.store.settle_reason() {
                    return Ok(reason);
                }
            }
            state => {
                return Err(InvalidState::new("observe", format!("session is {state}")).into());
            }
        }

        // A limit too large to represent as an instant never expires.
        let deadline = Instant::now().checked_add(limit);

        loop {
            self.settle_if_final();
            if let Some(reason) = self.store.settle_reason() {
                return Ok(reason);
            }

            let next = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, self.reconciler.next()).await,
                None => Ok(self.reconciler.next().await),
            };

            match next {
                Ok(Some(event)) => {
                    self.handle_event(event);
                }
                Ok(None) => {
                    self.store.settle(SettleReason::StreamClosed)?;
                }
                Err(_) => {
                    self.store.settle(SettleReason::TimedOut)?;
                }
            }
        }
    }

    /// Closes the mempool subscription.
    pub async fn shutdown(&mut self) {
        self.reconciler.close().await;
    }

    fn identity(&self) -> Result<&Identity, SessionError> {
        self.store
            .identity()
            .ok_or_else(|| InvalidState::new("read the identity", "no identity").into())
    }

    fn pair(&self) -> Result<&CandidatePair, SessionError> {
        self.store
            .pair()
            .ok_or_else(|| InvalidState::new("read the candidate pair", "no candidate pair").into())
    }

    async fn activate(&mut self, identity: Identity) {
        self.utxos.clear();
        self.store.set_identity(identity);
        self.open_stream().await;
    }

    /// A feed that cannot be opened leaves the session usable; the race will settle as
    /// soon as it is observed.
    async fn open_stream(&mut self) {
        let Some(address) = self.store.address().map(str::to_string) else {
            return;
        };

        if let Err(error) = self.reconciler.resubscribe(&address, self.network).await {
            warn!("Could not open mempool feed for {address} on {}: {error}", self.network);
        }
    }

    fn apply_broadcast(
        &mut self,
        pair: &CandidatePair,
        slot: Slot,
        result: &Result<Txid, ServiceError>,
    ) -> Result<(), InvalidState> {
        match result {
            Ok(txid) => {
                let expected = pair.get(slot).txid;
                if *txid != expected {
                    warn!("{slot} broadcast reported txid {txid}, expected {expected}");
                    self.store.annotate(
                        slot,
                        format!("service reported txid {txid}, expected {expected}"),
                    )?;
                }
            }
            Err(error) => match error.rejection_reason() {
                Some(reason) => {
                    warn!("{slot} was rejected: {reason}");
                    self.store.record_broadcast_outcome(
                        slot,
                        BroadcastOutcome::Rejected {
                            reason: reason.to_string(),
                        },
                    )?;
                }
                None => {
                    warn!("{slot} broadcast failed: {error}");
                    self.store.annotate(slot, error.to_string())?;
                }
            },
        }

        Ok(())
    }

    fn settle_if_final(&mut self) {
        if self.store.state() == SessionState::Racing && self.store.both_terminal() {
            self.store.settle(SettleReason::BothTerminal).ok();
        }
    }
}

async fn bounded<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    tokio::time::timeout(limit, request)
        .await
        .map_err(|_| ServiceError::Timeout(limit))?
}
