use std::str::FromStr;

use clap::{Args, Parser, Subcommand};
use dslab::prelude::{Network, Txid, Utxo};

#[derive(Debug, Parser)]
#[command(name = "dslab", version, about = "Race two conflicting transactions that spend one UTXO")]
pub struct Cli {
    /// Base URL of the transaction service.
    #[arg(long, env = "DSLAB_BASE_URL", default_value = "http://127.0.0.1:3000", global = true)]
    pub base_url: String,

    /// `testnet` or `main`.
    #[arg(long, env = "DSLAB_NETWORK", default_value_t = Network::Testnet, global = true)]
    pub network: Network,

    /// Upper bound on each call to the transaction service, in seconds.
    #[arg(long, env = "DSLAB_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Mempool websocket to use instead of the network's default.
    #[arg(long, env = "DSLAB_STREAM_URL", global = true)]
    pub stream_url: Option<String>,

    /// Permit broadcasting on the main network.
    #[arg(long, global = true)]
    pub allow_mainnet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a new address and signing key.
    Generate,
    /// List the UTXOs of an address.
    Utxos(UtxosCommand),
    /// Craft two conflicting transactions spending one UTXO.
    Craft(CraftCommand),
    /// Broadcast a raw transaction.
    Broadcast(BroadcastCommand),
    /// Print mempool sightings for an address.
    Watch(WatchCommand),
    /// Craft a pair, broadcast both at once and watch which one confirms.
    Race(RaceCommand),
}

#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// The funding address.
    #[arg(long, env = "DSLAB_ADDRESS")]
    pub address: String,

    /// The address's signing key in WIF.
    #[arg(long, env = "DSLAB_WIF", hide_env_values = true)]
    pub wif: String,
}

#[derive(Debug, Args)]
pub struct CraftArgs {
    /// Destination of TX-A.
    #[arg(long)]
    pub dest_a: String,

    /// Destination of TX-B.
    #[arg(long)]
    pub dest_b: String,

    /// Fee rate in sat/vB.
    #[arg(long, default_value_t = 3)]
    pub fee_rate: u64,

    /// Signal replace-by-fee on both transactions.
    #[arg(long)]
    pub rbf: bool,
}

#[derive(Debug, Args)]
pub struct UtxosCommand {
    #[arg(long, env = "DSLAB_ADDRESS")]
    pub address: String,
}

#[derive(Debug, Args)]
pub struct CraftCommand {
    #[command(flatten)]
    pub identity: IdentityArgs,

    /// The UTXO to spend, as `txid:vout:value`.
    #[arg(long)]
    pub utxo: UtxoArg,

    #[command(flatten)]
    pub craft: CraftArgs,
}

#[derive(Debug, Args)]
pub struct BroadcastCommand {
    /// The raw transaction hex.
    pub hex: String,
}

#[derive(Debug, Args)]
pub struct WatchCommand {
    #[arg(long, env = "DSLAB_ADDRESS")]
    pub address: String,

    /// Stop after this many sightings.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Stop after this many seconds.
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct RaceCommand {
    #[command(flatten)]
    pub identity: IdentityArgs,

    /// Index into the address's UTXO listing.
    #[arg(long, default_value_t = 0)]
    pub utxo_index: usize,

    #[command(flatten)]
    pub craft: CraftArgs,

    /// How long to watch for confirmations, in seconds.
    #[arg(long, default_value_t = 600)]
    pub observe_secs: u64,
}

/// A UTXO given on the command line as `txid:vout:value`.
#[derive(Debug, Clone, Copy)]
pub struct UtxoArg(pub Utxo);

impl FromStr for UtxoArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');

        let (Some(txid), Some(vout), Some(value), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err("expected txid:vout:value".to_string());
        };

        let txid = Txid::from_str(txid).map_err(|error| format!("invalid txid: {error}"))?;
        let vout = vout
            .parse()
            .map_err(|error| format!("invalid vout: {error}"))?;
        let value = value
            .parse()
            .map_err(|error| format!("invalid value: {error}"))?;

        Ok(Self(Utxo::new(txid, vout, value)))
    }
}
