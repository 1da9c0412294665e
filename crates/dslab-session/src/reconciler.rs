use std::collections::VecDeque;

use dslab_mempool::{Epoch, EpochEvent, EventSource, StreamError, Subscription};
use dslab_types::{MempoolEvent, Network, Slot};
use tracing::{debug, info};

use crate::{SessionState, SessionStore};

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// It came from a superseded subscription and was dropped.
    Stale,
    /// It was logged but matches neither candidate.
    Logged,
    /// It matches a candidate. `changed` is whether that candidate's outcome moved.
    Matched { slot: Slot, changed: bool },
}

/// Owns the mempool subscription for the session address and correlates its events
/// with the candidate pair.
#[derive(Debug)]
pub struct Reconciler<S> {
    source: S,
    epoch: Epoch,
    subscription: Option<Subscription>,
    log: VecDeque<MempoolEvent>,
    capacity: usize,
}

impl<S> Reconciler<S>
where
    S: EventSource,
{
    pub fn new(source: S, capacity: usize) -> Self {
        Self {
            source,
            epoch: Epoch::default(),
            subscription: None,
            log: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The epoch events must carry to be accepted.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_for(&self, address: &str, network: Network) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|subscription| subscription.is_for(address, network))
    }

    /// Recent sightings, newest first.
    pub fn log(&self) -> &VecDeque<MempoolEvent> {
        &self.log
    }

    /// Replaces the current subscription with one for `address` on `network`.
    ///
    /// The epoch advances even if the new subscription cannot be opened, so nothing
    /// from the old one is accepted afterwards.
    pub async fn resubscribe(&mut self, address: &str, network: Network) -> Result<Epoch, StreamError> {
        self.close().await;
        self.log.clear();

        if address.is_empty() {
            return Ok(self.epoch);
        }

        let subscription = self.source.subscribe(address, network, self.epoch).await?;
        self.subscription = Some(subscription);

        Ok(self.epoch)
    }

    pub async fn close(&mut self) {
        self.epoch = self.epoch.next();

        if let Some(subscription) = self.subscription.take() {
            info!(
                "Closing mempool subscription {} for {}",
                subscription.epoch(),
                subscription.address()
            );
            subscription.close().await;
        }
    }

    /// Waits for the next event. `None` means there is no subscription or the feed ended.
    pub async fn next(&mut self) -> Option<EpochEvent> {
        let subscription = self.subscription.as_mut()?;
        let event = subscription.recv().await;

        if event.is_none() {
            info!("Mempool feed {} ended", subscription.epoch());
            self.subscription = None;
        }

        event
    }

    /// Returns an already delivered event without waiting.
    pub fn try_next(&mut self) -> Option<EpochEvent> {
        self.subscription.as_mut()?.try_recv()
    }

    /// Logs `event` and, if it names a candidate, advances that candidate's outcome.
    ///
    /// Applying the same event twice logs it twice but never moves an outcome further.
    pub fn reconcile(&mut self, store: &mut SessionStore, event: EpochEvent) -> Reconciled {
        if event.epoch != self.epoch {
            debug!(
                "Dropping event for {} from stale subscription {} (current {})",
                event.event.txid, event.epoch, self.epoch
            );
            return Reconciled::Stale;
        }

        let event = event.event;
        self.record(event.clone());

        let Some(slot) = store.pair().and_then(|pair| pair.slot_of(&event.txid)) else {
            return Reconciled::Logged;
        };

        // Sightings before the first broadcast are logged but never start a race.
        if store.state() == SessionState::HasCandidatePair {
            debug!("{slot} seen before it was broadcast");
            return Reconciled::Matched {
                slot,
                changed: false,
            };
        }

        let changed = store
            .record_broadcast_outcome(slot, event.observed_outcome())
            .unwrap_or(false);

        Reconciled::Matched { slot, changed }
    }

    fn record(&mut self, event: MempoolEvent) {
        self.log.push_front(event);
        self.log.truncate(self.capacity);
    }
}
