use anyhow::Result;
use dslab::prelude::{CraftParams, Identity, TxService, Wif};

use crate::{args::CraftCommand, context::Context};

pub async fn craft(context: &Context, args: &CraftCommand) -> Result<()> {
    let identity = Identity::new(&args.identity.address, Wif::new(&args.identity.wif));
    let params = CraftParams {
        dest_a: args.craft.dest_a.clone(),
        dest_b: args.craft.dest_b.clone(),
        fee_rate: args.craft.fee_rate,
        rbf: args.craft.rbf,
    };

    let pair = context
        .service
        .craft_pair(&identity, &args.utxo.0, &params, context.network)
        .await?;

    println!("{}", serde_json::to_string_pretty(&pair)?);

    Ok(())
}
