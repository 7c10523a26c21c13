//! Black-box integration tests wiring the real `warp` control surface
//! against an `InMemoryStore` and a hand-written mock `LedgerClient`/mock
//! connector, covering the end-to-end scenarios the engine must satisfy.

use async_trait::async_trait;
use ilp_iroha_settlement_engine::api::create_control_surface_filter;
use ilp_iroha_settlement_engine::client::ConnectorClient;
use ilp_iroha_settlement_engine::engine::{EngineConfig, SettlementEngine};
use ilp_iroha_settlement_engine::errors::LedgerError;
use ilp_iroha_settlement_engine::ledger::{LedgerClient, LedgerTransaction, LedgerTransferCommand};
use ilp_iroha_settlement_engine::observer::IncomingObserver;
use ilp_iroha_settlement_engine::store::memory::InMemoryStore;
use ilp_iroha_settlement_engine::store::SettlementStore;
use ilp_iroha_settlement_engine::types::{AssetId, LedgerAccountId, PaymentDetailsMessage};
use num_bigint::BigUint;
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every submitted transfer so assertions can inspect what actually
/// reached "the ledger".
#[derive(Default)]
struct RecordingLedger {
    transfers: Mutex<Vec<(LedgerAccountId, LedgerAccountId, String)>>,
    transactions: Mutex<Vec<LedgerTransaction>>,
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    async fn get_account(&self, _account: &LedgerAccountId) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn submit_transfer(
        &self,
        from: &LedgerAccountId,
        to: &LedgerAccountId,
        _asset: &AssetId,
        _memo: &str,
        amount: BigUint,
    ) -> Result<(), LedgerError> {
        self.transfers
            .lock()
            .push((from.clone(), to.clone(), amount.to_string()));
        Ok(())
    }

    async fn list_account_asset_transactions(
        &self,
        _account: &LedgerAccountId,
        _asset: &AssetId,
        _page_size: u32,
        cursor: Option<&str>,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let all = self.transactions.lock();
        let start = match cursor {
            None => 0,
            Some(hash) => all
                .iter()
                .position(|tx| tx.hash == hash)
                .map(|i| i + 1)
                .unwrap_or(all.len()),
        };
        Ok(all[start..].to_vec())
    }

    async fn list_transactions_by_hashes(
        &self,
        hashes: &[String],
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let all = self.transactions.lock();
        Ok(all
            .iter()
            .filter(|tx| hashes.contains(&tx.hash))
            .cloned()
            .collect())
    }
}

fn engine_config() -> EngineConfig {
    EngineConfig {
        self_ledger_account: "alice@test".to_owned(),
        asset: "coin0#test".to_owned(),
        asset_scale: 2,
    }
}

#[tokio::test]
async fn happy_settlement_converts_scale_and_settles_once() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(RecordingLedger::default());
    store
        .save_peer_ledger_account(&"A".to_owned(), &"bob@test".to_owned())
        .await
        .unwrap();
    let engine = SettlementEngine::new(Arc::clone(&store), Arc::clone(&ledger), engine_config());

    let status = engine
        .settle(&"A".to_owned(), "K1", BigUint::from(500u32), 3)
        .await
        .unwrap();
    assert_eq!(status, 201);

    let transfers = ledger.transfers.lock();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].1, "bob@test");
    assert_eq!(transfers[0].2, "50");
    assert_eq!(
        store.get_leftover(&"A".to_owned()).await.unwrap(),
        BigUint::from(0u32)
    );
}

#[tokio::test]
async fn precision_loss_accumulates_into_a_settleable_whole() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(RecordingLedger::default());
    store
        .save_peer_ledger_account(&"A".to_owned(), &"bob@test".to_owned())
        .await
        .unwrap();
    let engine = SettlementEngine::new(Arc::clone(&store), Arc::clone(&ledger), engine_config());

    engine
        .settle(&"A".to_owned(), "K2", BigUint::from(505u32), 3)
        .await
        .unwrap();
    assert_eq!(
        store.get_leftover(&"A".to_owned()).await.unwrap(),
        BigUint::from(5u32)
    );

    engine
        .settle(&"A".to_owned(), "K3", BigUint::from(495u32), 3)
        .await
        .unwrap();
    assert_eq!(
        store.get_leftover(&"A".to_owned()).await.unwrap(),
        BigUint::from(0u32)
    );

    let transfers = ledger.transfers.lock();
    assert_eq!(transfers.len(), 2);
    assert!(transfers.iter().all(|t| t.2 == "50"));
}

#[tokio::test]
async fn idempotent_replay_performs_no_additional_ledger_call() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(RecordingLedger::default());
    store
        .save_peer_ledger_account(&"A".to_owned(), &"bob@test".to_owned())
        .await
        .unwrap();
    let engine = SettlementEngine::new(Arc::clone(&store), Arc::clone(&ledger), engine_config());

    let first = engine
        .settle(&"A".to_owned(), "K1", BigUint::from(500u32), 3)
        .await
        .unwrap();
    let second = engine
        .settle(&"A".to_owned(), "K1", BigUint::from(500u32), 3)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(ledger.transfers.lock().len(), 1);
}

#[tokio::test]
async fn settlement_request_for_unknown_peer_is_fatal_but_not_persisted() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(RecordingLedger::default());
    let engine = SettlementEngine::new(Arc::clone(&store), Arc::clone(&ledger), engine_config());

    let err = engine
        .settle(&"A".to_owned(), "K1", BigUint::from(500u32), 3)
        .await
        .unwrap_err();
    assert_eq!(err.status, http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.get_request_status("K1").await.unwrap(), None);
}

#[tokio::test]
async fn handshake_over_http_establishes_peer_identity_both_directions() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(RecordingLedger::default());
    let engine = Arc::new(SettlementEngine::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        engine_config(),
    ));
    let connector = ConnectorClient::new("http://127.0.0.1:1".parse().unwrap());
    let filter = create_control_surface_filter(Arc::clone(&engine), connector);

    let body = serde_json::to_vec(&PaymentDetailsMessage {
        iroha_account_id: "bob@test".to_owned(),
    })
    .unwrap();
    let res = warp::test::request()
        .method("POST")
        .path("/accounts/A/messages")
        .body(body)
        .reply(&filter)
        .await;
    assert_eq!(res.status(), 201);
    let reply: PaymentDetailsMessage = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(reply.iroha_account_id, "alice@test");
    assert_eq!(
        store.get_peer_ledger_account(&"A".to_owned()).await.unwrap(),
        Some("bob@test".to_owned())
    );
}

#[tokio::test]
async fn observer_notifies_connector_of_a_committed_settlement_transfer() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    store
        .save_peer_ledger_account(&"A".to_owned(), &"bob@test".to_owned())
        .await
        .unwrap();
    let ledger = Arc::new(RecordingLedger::default());
    ledger.transactions.lock().push(LedgerTransaction {
        hash: "0xabc".to_owned(),
        transfers: vec![LedgerTransferCommand {
            src: "bob@test".to_owned(),
            dst: "alice@test".to_owned(),
            asset: "coin0#test".to_owned(),
            amount: "2500".to_owned(),
            memo: Some("ILP Settlement".to_owned()),
        }],
    });

    let _m = mockito::mock("POST", "/accounts/A/settlements")
        .match_header("Idempotency-Key", mockito::Matcher::Any)
        .with_status(201)
        .create();

    let connector = ConnectorClient::new(mockito::server_url().parse().unwrap());
    let observer = IncomingObserver::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        connector,
        Arc::new(engine_config()),
    );

    observer.run_once().await.unwrap();

    assert!(store.was_tx_checked("0xabc").await.unwrap());
    _m.assert();
}

#[tokio::test]
async fn observer_skips_transfers_with_the_wrong_memo() {
    let _ = env_logger::try_init();
    let store = Arc::new(InMemoryStore::new());
    store
        .save_peer_ledger_account(&"A".to_owned(), &"bob@test".to_owned())
        .await
        .unwrap();
    let ledger = Arc::new(RecordingLedger::default());
    ledger.transactions.lock().push(LedgerTransaction {
        hash: "0xdef".to_owned(),
        transfers: vec![LedgerTransferCommand {
            src: "bob@test".to_owned(),
            dst: "alice@test".to_owned(),
            asset: "coin0#test".to_owned(),
            amount: "2500".to_owned(),
            memo: Some("unrelated application traffic".to_owned()),
        }],
    });

    let _m = mockito::mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create();

    let connector = ConnectorClient::new(mockito::server_url().parse().unwrap());
    let observer = IncomingObserver::new(
        Arc::clone(&store),
        Arc::clone(&ledger),
        connector,
        Arc::new(engine_config()),
    );

    observer.run_once().await.unwrap();

    assert!(store.was_tx_checked("0xdef").await.unwrap());
    _m.assert();
}
