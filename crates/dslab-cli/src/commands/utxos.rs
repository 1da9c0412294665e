use anyhow::Result;
use dslab::prelude::TxService;

use crate::{args::UtxosCommand, context::Context};

pub async fn utxos(context: &Context, args: &UtxosCommand) -> Result<()> {
    let utxos = context
        .service
        .list_utxos(&args.address, context.network)
        .await?;

    println!("{}", serde_json::to_string_pretty(&utxos)?);

    Ok(())
}
