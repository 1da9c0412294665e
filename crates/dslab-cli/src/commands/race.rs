use std::time::Duration;

use anyhow::Result;
use dslab::prelude::{Slot, Wif};
use serde_json::{json, Value};
use tracing::info;

use crate::{args::RaceCommand, context::Context};

pub async fn race(context: &Context, args: &RaceCommand) -> Result<()> {
    context.ensure_spending_allowed()?;

    let mut lab = context.orchestrator();

    lab.import_identity(&args.identity.address, Wif::new(&args.identity.wif))
        .await?;
    lab.load_utxos().await?;
    let utxo = lab.select_utxo_at(args.utxo_index)?;
    info!("Spending {utxo}");

    lab.set_destinations(&args.craft.dest_a, &args.craft.dest_b)?;
    lab.set_fee_rate(args.craft.fee_rate)?;
    lab.set_rbf(args.craft.rbf);

    let pair = lab.craft_pair().await?;
    println!("{}", serde_json::to_string_pretty(pair)?);

    let report = lab.broadcast_both().await?;
    for slot in Slot::BOTH {
        match report.get(slot) {
            Ok(txid) => info!("{slot} accepted as {txid}"),
            Err(error) => info!("{slot} not accepted: {error}"),
        }
    }

    let reason = lab
        .observe_for(Duration::from_secs(args.observe_secs))
        .await?;

    let store = lab.store();
    let candidate = |slot: Slot| -> Value {
        let status = store.candidate(slot);
        json!({
            "txid": store.pair().map(|pair| pair.get(slot).txid),
            "outcome": status.outcome,
            "note": status.note,
        })
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "input": store.pair().map(|pair| pair.input().to_string()),
            "a": candidate(Slot::A),
            "b": candidate(Slot::B),
            "settled": reason.to_string(),
        }))?
    );

    lab.shutdown().await;

    Ok(())
}
