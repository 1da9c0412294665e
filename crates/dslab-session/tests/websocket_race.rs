use std::time::Duration;

use dslab_mempool::{StreamEndpoints, StreamOptions, WebSocketSource};
use dslab_service::MockTxService;
use dslab_session::{LabConfig, Orchestrator, SessionState, SettleReason};
use dslab_test::{
    double_spend_response, outpoint, MempoolSimulator, TESTNET_ADDRESS_A, TESTNET_ADDRESS_B,
    TEST_WIF,
};
use dslab_types::{BroadcastOutcome, Slot};
use serde_json::json;

#[tokio::test]
async fn test_race_settles_over_websocket_feed() -> anyhow::Result<()> {
    let sim = MempoolSimulator::new().await?;

    let service = MockTxService::new();
    service.mock_response(
        "http://api.example.com/api/generate-key",
        &json!({ "address": TESTNET_ADDRESS_A, "wif": TEST_WIF }).to_string(),
    );
    service.mock_response(
        "http://api.example.com/api/utxos",
        &json!([{ "txid": "a".repeat(64), "vout": 0, "value": 100_000 }]).to_string(),
    );
    let (tx1, _, body) = double_spend_response(outpoint('a', 0));
    service.mock_response("http://api.example.com/api/double-spend", &body);
    service.mock_response(
        "http://api.example.com/api/broadcast",
        &json!({ "txid": tx1.txid }).to_string(),
    );
    service.mock_response(
        "http://api.example.com/api/broadcast",
        r#"{"error": "txn-mempool-conflict"}"#,
    );

    let source = WebSocketSource::new(StreamOptions {
        endpoints: StreamEndpoints::single(sim.url()),
        ..StreamOptions::default()
    });
    let config = LabConfig {
        observation_timeout: Duration::from_secs(10),
        ..LabConfig::default()
    };
    let mut lab = Orchestrator::new(service, source, config);

    lab.generate_identity().await?;
    assert!(lab.is_observing());

    let subscribe = sim.wait_for_received(1).await?;
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&subscribe[0])?,
        json!({ "track-address": TESTNET_ADDRESS_A })
    );

    lab.load_utxos().await?;
    lab.select_utxo_at(0)?;
    lab.set_destinations(TESTNET_ADDRESS_A, TESTNET_ADDRESS_B)?;
    lab.craft_pair().await?;
    lab.broadcast_both().await?;
    assert_eq!(lab.state(), SessionState::Racing);

    sim.push_json(&json!({
        "block-transactions": [{ "txid": tx1.txid, "fee": 420, "vsize": 140 }],
        "block": { "height": 810_000 },
    }))
    .await;

    assert_eq!(lab.observe().await?, SettleReason::BothTerminal);
    assert_eq!(
        lab.store().outcome(Slot::A),
        &BroadcastOutcome::ObservedConfirmed { block: 810_000 }
    );
    assert!(matches!(
        lab.store().outcome(Slot::B),
        BroadcastOutcome::Rejected { .. }
    ));
    assert_eq!(lab.mempool_log()[0].fee_rate, Some(3.0));

    lab.shutdown().await;
    Ok(())
}
