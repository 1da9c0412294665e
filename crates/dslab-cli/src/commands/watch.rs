use std::time::Duration;

use anyhow::Result;
use dslab::prelude::{Epoch, EventSource};
use tokio::time::Instant;
use tracing::info;

use crate::{args::WatchCommand, context::Context};

pub async fn watch(context: &Context, args: &WatchCommand) -> Result<()> {
    let mut subscription = context
        .source()
        .subscribe(&args.address, context.network, Epoch::default())
        .await?;

    let deadline = args
        .duration_secs
        .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));
    let mut seen = 0;

    loop {
        if args.limit.is_some_and(|limit| seen >= limit) {
            break;
        }

        let next = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, subscription.recv())
                    .await
                    .ok()
                    .flatten(),
                None => subscription.recv().await,
            }
        };

        let event = tokio::select! {
            event = next => event,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(event) = event else {
            break;
        };

        println!("{}", serde_json::to_string(&event.event)?);
        seen += 1;
    }

    info!("Stopped watching after {seen} sightings");
    subscription.close().await;

    Ok(())
}
