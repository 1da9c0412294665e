use std::time::Duration;

use dslab_types::Network;

/// Session-wide settings. Stream endpoints live in [`dslab_mempool::StreamOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabConfig {
    pub network: Network,
    /// Upper bound on every call to the transaction service.
    pub request_timeout: Duration,
    /// How long [`crate::Orchestrator::observe`] waits before settling a race.
    pub observation_timeout: Duration,
    /// How many recent mempool sightings are kept.
    pub mempool_log_capacity: usize,
    /// Sat/vB.
    pub default_fee_rate: u64,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            request_timeout: Duration::from_secs(30),
            observation_timeout: Duration::from_secs(600),
            mempool_log_capacity: 10,
            default_fee_rate: 3,
        }
    }
}
