use std::future::Future;

use dslab_types::{CandidatePair, CraftParams, Identity, Network, Txid, Utxo, ValidationError};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    verify_conflicting_pair, ApiResponse, BroadcastRequest, BroadcastResponse, DoubleSpendRequest,
    DoubleSpendResponse, ServiceError,
};

/// The four remote operations the lab delegates to its signing service.
///
/// Each call is a single round trip. Nothing is retried here; that is up to the caller.
pub trait TxService {
    fn base_url(&self) -> &str;

    fn make_get_request<R>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<R, ServiceError>>
    where
        R: DeserializeOwned + Send;

    fn make_post_request<R, B>(
        &self,
        endpoint: &str,
        body: B,
    ) -> impl Future<Output = Result<R, ServiceError>>
    where
        B: Serialize + Send,
        R: DeserializeOwned + Send;

    fn generate_identity(
        &self,
        network: Network,
    ) -> impl Future<Output = Result<Identity, ServiceError>> {
        async move {
            let identity = self
                .make_get_request::<ApiResponse<Identity>>(
                    "api/generate-key",
                    &[("net", network.as_str())],
                )
                .await?
                .into_result()
                .map_err(ServiceError::Remote)?;

            if identity.address.is_empty() || identity.wif.is_empty() {
                return Err(ServiceError::Malformed(
                    "generated identity has an empty address or key".to_string(),
                ));
            }

            Ok(identity)
        }
    }

    fn list_utxos(
        &self,
        address: &str,
        network: Network,
    ) -> impl Future<Output = Result<Vec<Utxo>, ServiceError>> {
        async move {
            if address.is_empty() {
                return Err(ValidationError::Missing("address").into());
            }

            self.make_get_request::<ApiResponse<Vec<Utxo>>>(
                "api/utxos",
                &[("address", address), ("net", network.as_str())],
            )
            .await?
            .into_result()
            .map_err(ServiceError::Remote)
        }
    }

    /// Asks the service for two transactions spending `utxo`, one paying each destination.
    ///
    /// The response is decoded and checked before it is returned. A pair that does not spend
    /// `utxo` in both transactions fails with [`ServiceError::ProtocolViolation`].
    fn craft_pair(
        &self,
        identity: &Identity,
        utxo: &Utxo,
        params: &CraftParams,
        network: Network,
    ) -> impl Future<Output = Result<CandidatePair, ServiceError>> {
        async move {
            if identity.wif.is_empty() {
                return Err(ValidationError::Missing("signing key").into());
            }
            params.validate(network)?;

            let response = self
                .make_post_request::<ApiResponse<DoubleSpendResponse>, _>(
                    "api/double-spend",
                    DoubleSpendRequest {
                        wif: identity.wif.expose(),
                        utxo,
                        output_address1: &params.dest_a,
                        output_address2: &params.dest_b,
                        fee_rate: params.fee_rate,
                        net: network,
                        enable_rbf: params.rbf,
                    },
                )
                .await?
                .into_result()
                .map_err(ServiceError::Rejected)?;

            verify_conflicting_pair(utxo.outpoint(), response.tx1, response.tx2)
        }
    }

    fn broadcast(
        &self,
        hex: &str,
        network: Network,
    ) -> impl Future<Output = Result<Txid, ServiceError>> {
        async move {
            if hex.is_empty() {
                return Err(ValidationError::Missing("raw transaction").into());
            }

            let response = self
                .make_post_request::<ApiResponse<BroadcastResponse>, _>(
                    "api/broadcast",
                    BroadcastRequest { hex, net: network },
                )
                .await?
                .into_result()
                .map_err(ServiceError::Rejected)?;

            Ok(response.txid)
        }
    }
}

#[cfg(test)]
mod tests {
    use dslab_test::{candidate, outpoint, spend_transaction, TESTNET_ADDRESS_A, TESTNET_ADDRESS_B};
    use dslab_types::{ErrorKind, Wif};
    use serde_json::json;

    use crate::{MockTxService, ProtocolViolation};

    use super::*;

    fn identity() -> Identity {
        Identity::new(TESTNET_ADDRESS_A, Wif::new("cTestKey"))
    }

    fn params() -> CraftParams {
        CraftParams {
            dest_a: TESTNET_ADDRESS_A.to_string(),
            dest_b: TESTNET_ADDRESS_B.to_string(),
            fee_rate: 3,
            rbf: false,
        }
    }

    #[tokio::test]
    async fn test_generate_identity() -> anyhow::Result<()> {
        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/generate-key",
            r#"{"address": "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx", "wif": "cTestKey"}"#,
        );

        let identity = client.generate_identity(Network::Testnet).await?;
        assert_eq!(identity.address, TESTNET_ADDRESS_A);
        assert_eq!(identity.wif.expose(), "cTestKey");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, json!({"net": "testnet"}));

        Ok(())
    }

    #[tokio::test]
    async fn test_generate_identity_error() {
        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/generate-key",
            r#"{"error": "key service unavailable"}"#,
        );

        let error = client
            .generate_identity(Network::Main)
            .await
            .unwrap_err();
        assert!(matches!(&error, ServiceError::Remote(message) if message == "key service unavailable"));
        assert_eq!(error.kind(), ErrorKind::Service);
    }

    #[tokio::test]
    async fn test_list_utxos() -> anyhow::Result<()> {
        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/utxos",
            &json!([
                {"txid": "a".repeat(64), "vout": 0, "value": 100_000},
                {"txid": "b".repeat(64), "vout": 3, "value": 5_000},
            ])
            .to_string(),
        );

        let utxos = client.list_utxos(TESTNET_ADDRESS_A, Network::Testnet).await?;
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].outpoint(), outpoint('a', 0));
        assert_eq!(utxos[1].value, 5_000);

        assert_eq!(
            client.requests()[0].1,
            json!({"address": TESTNET_ADDRESS_A, "net": "testnet"})
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_list_utxos_requires_address() {
        let client = MockTxService::new();
        let error = client.list_utxos("", Network::Testnet).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_craft_pair() -> anyhow::Result<()> {
        let input = outpoint('a', 0);
        let tx1 = candidate(&spend_transaction(input, 99_000));
        let tx2 = candidate(&spend_transaction(input, 98_500));

        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/double-spend",
            &json!({ "tx1": tx1, "tx2": tx2 }).to_string(),
        );

        let utxo = Utxo::new(input.txid, input.vout, 100_000);
        let pair = client
            .craft_pair(&identity(), &utxo, &params(), Network::Testnet)
            .await?;

        assert_eq!(pair.input(), input);
        assert_eq!(pair.a(), &tx1);
        assert_eq!(pair.b(), &tx2);

        let body = &client.requests()[0].1;
        assert_eq!(body["wif"], "cTestKey");
        assert_eq!(body["outputAddress1"], TESTNET_ADDRESS_A);
        assert_eq!(body["outputAddress2"], TESTNET_ADDRESS_B);
        assert_eq!(body["feeRate"], 3);
        assert_eq!(body["enableRBF"], false);

        Ok(())
    }

    #[tokio::test]
    async fn test_craft_pair_with_mismatched_inputs() {
        let tx1 = candidate(&spend_transaction(outpoint('a', 0), 99_000));
        let tx2 = candidate(&spend_transaction(outpoint('b', 1), 99_000));

        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/double-spend",
            &json!({ "tx1": tx1, "tx2": tx2 }).to_string(),
        );

        let utxo = Utxo::new(outpoint('a', 0).txid, 0, 100_000);
        let error = client
            .craft_pair(&identity(), &utxo, &params(), Network::Testnet)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ProtocolViolation);
        assert!(matches!(
            error,
            ServiceError::ProtocolViolation(ProtocolViolation::InputMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_craft_pair_validates_locally() {
        let client = MockTxService::new();
        let utxo = Utxo::new(outpoint('a', 0).txid, 0, 100_000);

        let mut bad = params();
        bad.dest_b = "X".to_string();
        let error = client
            .craft_pair(&identity(), &utxo, &bad, Network::Testnet)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);

        let mut bad = params();
        bad.fee_rate = 0;
        let error = client
            .craft_pair(&identity(), &utxo, &bad, Network::Testnet)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ServiceError::Validation(ValidationError::ZeroFeeRate)
        ));

        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_craft_pair_spent_input_is_rejection() {
        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/double-spend",
            r#"{"error": "UTXO already spent"}"#,
        );

        let utxo = Utxo::new(outpoint('a', 0).txid, 0, 100_000);
        let error = client
            .craft_pair(&identity(), &utxo, &params(), Network::Testnet)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Rejection);
        assert_eq!(error.rejection_reason(), Some("UTXO already spent"));
    }

    #[tokio::test]
    async fn test_broadcast() -> anyhow::Result<()> {
        let tx = candidate(&spend_transaction(outpoint('a', 0), 99_000));

        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/broadcast",
            &json!({ "txid": tx.txid }).to_string(),
        );

        let txid = client.broadcast(&tx.hex, Network::Testnet).await?;
        assert_eq!(txid, tx.txid);
        assert_eq!(
            client.requests()[0].1,
            json!({ "hex": tx.hex, "net": "testnet" })
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_broadcast_rejected_verbatim() {
        let client = MockTxService::new();
        client.mock_response(
            "http://api.example.com/api/broadcast",
            r#"{"error": "sendrawtransaction RPC error: {\"code\":-26,\"message\":\"txn-mempool-conflict\"}"}"#,
        );

        let error = client
            .broadcast("0200", Network::Testnet)
            .await
            .unwrap_err();

        assert_eq!(
            error.rejection_reason(),
            Some(r#"sendrawtransaction RPC error: {"code":-26,"message":"txn-mempool-conflict"}"#)
        );
    }
}
