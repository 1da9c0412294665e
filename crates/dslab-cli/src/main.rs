mod args;
mod commands;
mod context;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::{
    args::{Cli, Command},
    context::Context,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let context = Context::new(&cli)?;

    match &cli.command {
        Command::Generate => commands::generate(&context).await?,
        Command::Utxos(args) => commands::utxos(&context, args).await?,
        Command::Craft(args) => commands::craft(&context, args).await?,
        Command::Broadcast(args) => commands::broadcast(&context, args).await?,
        Command::Watch(args) => commands::watch(&context, args).await?,
        Command::Race(args) => commands::race(&context, args).await?,
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}
