use anyhow::Result;
use dslab::prelude::TxService;

use crate::{args::BroadcastCommand, context::Context};

pub async fn broadcast(context: &Context, args: &BroadcastCommand) -> Result<()> {
    context.ensure_spending_allowed()?;

    let txid = context
        .service
        .broadcast(args.hex.trim(), context.network)
        .await?;

    println!("{txid}");

    Ok(())
}
