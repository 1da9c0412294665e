use anyhow::Result;
use dslab::prelude::TxService;
use serde_json::json;

use crate::context::Context;

pub async fn generate(context: &Context) -> Result<()> {
    let identity = context.service.generate_identity(context.network).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "address": identity.address,
            "wif": identity.wif.expose(),
            "network": context.network,
        }))?
    );

    Ok(())
}
