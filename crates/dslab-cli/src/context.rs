use std::time::Duration;

use anyhow::{bail, Result};
use dslab::prelude::{
    HttpTxService, LabConfig, Network, Orchestrator, StreamEndpoints, StreamOptions,
    WebSocketSource,
};
use tracing::warn;

use crate::args::Cli;

/// Settings shared by every command, resolved from the global arguments.
#[derive(Debug)]
pub struct Context {
    pub network: Network,
    pub service: HttpTxService,
    pub config: LabConfig,
    pub stream: StreamOptions,
    allow_mainnet: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let request_timeout = Duration::from_secs(cli.timeout_secs);

        if cli.network.is_main() {
            warn!("Using the main network. Transactions broadcast here spend real funds.");
        }

        let stream = StreamOptions {
            endpoints: cli
                .stream_url
                .clone()
                .map_or_else(StreamEndpoints::default, StreamEndpoints::single),
            ..StreamOptions::default()
        };

        Ok(Self {
            network: cli.network,
            service: HttpTxService::with_timeout(&cli.base_url, request_timeout)?,
            config: LabConfig {
                network: cli.network,
                request_timeout,
                ..LabConfig::default()
            },
            stream,
            allow_mainnet: cli.allow_mainnet,
        })
    }

    /// Refuses to continue on the main network unless `--allow-mainnet` was given.
    pub fn ensure_spending_allowed(&self) -> Result<()> {
        if self.network.is_main() && !self.allow_mainnet {
            bail!("refusing to broadcast on the main network without --allow-mainnet");
        }
        Ok(())
    }

    pub fn source(&self) -> WebSocketSource {
        WebSocketSource::new(self.stream.clone())
    }

    pub fn orchestrator(&self) -> Orchestrator<HttpTxService, WebSocketSource> {
        Orchestrator::new(self.service.clone(), self.source(), self.config)
    }
}
