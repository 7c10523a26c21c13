//! The Control Surface: the four HTTP endpoints the connector calls,
//! expressed as a `warp::Filter` stack directly grounded on
//! `interledger_settlement::core::engines_api::create_settlement_engine_filter`.

use crate::client::ConnectorClient;
use crate::engine::SettlementEngine;
use crate::errors::{default_rejection_handler, ApiError};
use crate::ledger::LedgerClient;
use crate::store::SettlementStore;
use crate::types::{CreateAccount, PaymentDetailsMessage, SettlementQuantity};
use bytes::Bytes;
use num_bigint::BigUint;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use warp::{http::StatusCode, reply::Response, Filter, Reply};

fn ok_json<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    let mut res = warp::reply::json(body).into_response();
    *res.status_mut() = status;
    res
}

async fn post_accounts<S, L>(
    account: CreateAccount,
    engine: Arc<SettlementEngine<S, L>>,
    connector: ConnectorClient,
) -> Result<Response, warp::Rejection>
where
    S: SettlementStore,
    L: LedgerClient,
{
    if engine
        .peer_account_known(&account.id)
        .await
        .map_err(warp::reject::custom)?
    {
        return Ok(ok_json(StatusCode::CREATED, &serde_json::json!({})));
    }

    let handshake = PaymentDetailsMessage {
        iroha_account_id: engine.config.self_ledger_account.clone(),
    };
    let response = connector
        .send_peer_handshake(&account.id, &handshake)
        .await
        .map_err(|err| {
            error!(sid = %account.id, error = %err, "peer handshake failed");
            warp::reject::custom(ApiError::internal_server_error().detail(err.to_string()))
        })?;

    engine
        .link_peer_account(&account.id, &response.iroha_account_id)
        .await
        .map_err(warp::reject::custom)?;
    info!(sid = %account.id, "account setup complete");
    Ok(ok_json(StatusCode::CREATED, &serde_json::json!({})))
}

async fn delete_account<S, L>(
    sid: String,
    engine: Arc<SettlementEngine<S, L>>,
) -> Result<Response, warp::Rejection>
where
    S: SettlementStore,
    L: LedgerClient,
{
    engine.delete_account(&sid).await.map_err(warp::reject::custom)?;
    Ok(warp::http::Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Bytes::new().into())
        .expect("response is well-formed"))
}

async fn post_settlement<S, L>(
    sid: String,
    idempotency_key: Option<String>,
    quantity: SettlementQuantity,
    engine: Arc<SettlementEngine<S, L>>,
) -> Result<Response, warp::Rejection>
where
    S: SettlementStore,
    L: LedgerClient,
{
    let key = idempotency_key
        .ok_or_else(|| warp::reject::custom(ApiError::bad_request().detail("missing Idempotency-Key header")))?;
    let amount = BigUint::from_str(&quantity.amount)
        .map_err(|_| warp::reject::custom(ApiError::bad_request().detail("malformed amount")))?;
    let status = engine
        .settle(&sid, &key, amount, quantity.scale)
        .await
        .map_err(warp::reject::custom)?;
    Ok(ok_json(
        StatusCode::from_u16(status).unwrap_or(StatusCode::CREATED),
        &serde_json::json!({}),
    ))
}

async fn post_message<S, L>(
    sid: String,
    body: Bytes,
    engine: Arc<SettlementEngine<S, L>>,
) -> Result<Response, warp::Rejection>
where
    S: SettlementStore,
    L: LedgerClient,
{
    let incoming: PaymentDetailsMessage = serde_json::from_slice(&body)
        .map_err(|_| warp::reject::custom(ApiError::bad_request().detail("malformed message body")))?;
    engine
        .link_peer_account(&sid, &incoming.iroha_account_id)
        .await
        .map_err(warp::reject::custom)?;
    let response = PaymentDetailsMessage {
        iroha_account_id: engine.config.self_ledger_account.clone(),
    };
    let mut res = Response::new(
        serde_json::to_vec(&response)
            .expect("PaymentDetailsMessage always serializes")
            .into(),
    );
    *res.status_mut() = StatusCode::CREATED;
    res.headers_mut().insert(
        "Content-Type",
        warp::http::HeaderValue::from_static("application/octet-stream"),
    );
    Ok(res)
}

/// Builds the complete control-surface filter, closing over `Arc`-wrapped
/// clones of the engine and connector client the same way
/// `create_settlement_engine_filter` closes over `engine`/`store`.
pub fn create_control_surface_filter<S, L>(
    engine: Arc<SettlementEngine<S, L>>,
    connector: ConnectorClient,
) -> warp::filters::BoxedFilter<(impl Reply,)>
where
    S: SettlementStore + 'static,
    L: LedgerClient + 'static,
{
    let with_engine = warp::any().map(move || Arc::clone(&engine)).boxed();
    let with_connector = warp::any().map(move || connector.clone()).boxed();
    let account_id = warp::path("accounts").and(warp::path::param::<String>());
    let idempotency = warp::header::optional::<String>("idempotency-key");

    let accounts = warp::post()
        .and(warp::path("accounts"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with_engine.clone())
        .and(with_connector)
        .and_then(post_accounts);

    let del_account = warp::delete()
        .and(account_id)
        .and(warp::path::end())
        .and(with_engine.clone())
        .and_then(delete_account);

    let settlements = warp::post()
        .and(account_id)
        .and(warp::path("settlements"))
        .and(warp::path::end())
        .and(idempotency)
        .and(warp::body::json())
        .and(with_engine.clone())
        .and_then(post_settlement);

    let messages = warp::post()
        .and(account_id)
        .and(warp::path("messages"))
        .and(warp::path::end())
        .and(warp::body::bytes())
        .and(with_engine)
        .and_then(post_message);

    accounts
        .or(del_account)
        .or(settlements)
        .or(messages)
        .recover(default_rejection_handler)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::ledger::{LedgerTransaction, LedgerTransferCommand};
    use crate::store::memory::InMemoryStore;
    use crate::types::{AssetId, LedgerAccountId};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct MockLedger;

    #[async_trait]
    impl LedgerClient for MockLedger {
        async fn get_account(&self, _account: &LedgerAccountId) -> Result<(), crate::errors::LedgerError> {
            Ok(())
        }

        async fn submit_transfer(
            &self,
            _from: &LedgerAccountId,
            _to: &LedgerAccountId,
            _asset: &AssetId,
            _memo: &str,
            _amount: BigUint,
        ) -> Result<(), crate::errors::LedgerError> {
            Ok(())
        }

        async fn list_account_asset_transactions(
            &self,
            _account: &LedgerAccountId,
            _asset: &AssetId,
            _page_size: u32,
            _cursor: Option<&str>,
        ) -> Result<Vec<LedgerTransaction>, crate::errors::LedgerError> {
            Ok(Vec::new())
        }

        async fn list_transactions_by_hashes(
            &self,
            _hashes: &[String],
        ) -> Result<Vec<LedgerTransaction>, crate::errors::LedgerError> {
            Ok(Vec::new())
        }
    }

    fn test_engine() -> Arc<SettlementEngine<InMemoryStore, MockLedger>> {
        Arc::new(SettlementEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MockLedger),
            EngineConfig {
                self_ledger_account: "alice@test".to_owned(),
                asset: "coin0#test".to_owned(),
                asset_scale: 2,
            },
        ))
    }

    #[tokio::test]
    async fn delete_unknown_account_returns_500() {
        let engine = test_engine();
        let connector = ConnectorClient::new("http://127.0.0.1:9".parse().unwrap());
        let filter = create_control_surface_filter(engine, connector);
        let res = warp::test::request()
            .method("DELETE")
            .path("/accounts/unknown")
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 500);
    }

    #[tokio::test]
    async fn settlement_without_idempotency_key_is_bad_request() {
        let engine = test_engine();
        let connector = ConnectorClient::new("http://127.0.0.1:9".parse().unwrap());
        let filter = create_control_surface_filter(engine, connector);
        let res = warp::test::request()
            .method("POST")
            .path("/accounts/s1/settlements")
            .json(&SettlementQuantity::new("100", 2))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 400);
    }

    #[tokio::test]
    async fn settlement_without_known_peer_fails() {
        let engine = test_engine();
        let connector = ConnectorClient::new("http://127.0.0.1:9".parse().unwrap());
        let filter = create_control_surface_filter(engine, connector);
        let res = warp::test::request()
            .method("POST")
            .path("/accounts/s1/settlements")
            .header("idempotency-key", "k1")
            .json(&SettlementQuantity::new("100", 2))
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 500);
    }

    #[tokio::test]
    async fn message_handshake_links_peer_and_replies_with_our_identity() {
        let engine = test_engine();
        let connector = ConnectorClient::new("http://127.0.0.1:9".parse().unwrap());
        let body = serde_json::to_vec(&PaymentDetailsMessage {
            iroha_account_id: "bob@test".to_owned(),
        })
        .unwrap();
        let filter = create_control_surface_filter(Arc::clone(&engine), connector);
        let res = warp::test::request()
            .method("POST")
            .path("/accounts/s1/messages")
            .body(body)
            .reply(&filter)
            .await;
        assert_eq!(res.status(), 201);
        let reply: PaymentDetailsMessage = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(reply.iroha_account_id, "alice@test");
        assert_eq!(
            engine.store.get_peer_ledger_account(&"s1".to_owned()).await.unwrap(),
            Some("bob@test".to_owned())
        );
    }
}
