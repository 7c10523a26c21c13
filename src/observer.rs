//! The Incoming Observer: a periodic task that watches the ledger for
//! committed settlement transfers addressed to this engine and relays them
//! to the connector. Grounded on the teacher's `Interval`-driven
//! `notify_connector_on_incoming_settlement` in `eth_engine.rs`, re-expressed
//! with `tokio::time::interval`/`async` the way the teacher's own `ilp-node`
//! crate already does for its newer polling loops.

use crate::client::ConnectorClient;
use crate::engine::{EngineConfig, SETTLEMENT_MEMO};
use crate::ledger::{LedgerClient, LedgerTransaction};
use crate::store::SettlementStore;
use crate::types::SettlementQuantity;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PAGE_SIZE: u32 = 10;

pub struct IncomingObserver<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    connector: ConnectorClient,
    config: Arc<EngineConfig>,
    tick_in_progress: AtomicBool,
}

impl<S, L> IncomingObserver<S, L>
where
    S: SettlementStore,
    L: LedgerClient,
{
    pub fn new(
        store: Arc<S>,
        ledger: Arc<L>,
        connector: ConnectorClient,
        config: Arc<EngineConfig>,
    ) -> Self {
        IncomingObserver {
            store,
            ledger,
            connector,
            config,
            tick_in_progress: AtomicBool::new(false),
        }
    }

    /// Runs forever on the given period, coalescing ticks: if a tick is
    /// still running when the next would fire, that firing is skipped
    /// rather than queued.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if self
                .tick_in_progress
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("skipping observer tick, previous tick still running");
                continue;
            }
            let this = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(err) = this.tick().await {
                    warn!(error = %err, "observer tick failed");
                }
                this.tick_in_progress.store(false, Ordering::SeqCst);
            });
        }
    }

    /// Runs a single poll iteration directly, bypassing the timer. Used by
    /// integration tests that need a deterministic single tick.
    pub async fn run_once(&self) -> Result<(), crate::errors::LedgerError> {
        self.tick().await
    }

    async fn tick(&self) -> Result<(), crate::errors::LedgerError> {
        let cursor = self.store.get_last_checked_tx_hash().await.ok().flatten();
        let new_txs = self
            .ledger
            .list_account_asset_transactions(
                &self.config.self_ledger_account,
                &self.config.asset,
                PAGE_SIZE,
                cursor.as_deref(),
            )
            .await?;
        for tx in &new_txs {
            self.process(tx, true).await;
        }

        let unchecked = self.store.get_unchecked_tx_hashes().await.unwrap_or_default();
        if !unchecked.is_empty() {
            let retried = self.ledger.list_transactions_by_hashes(&unchecked).await?;
            for tx in &retried {
                self.process(tx, false).await;
            }
        }
        Ok(())
    }

    /// Implements §4.E's `process(tx, cursor_eligible)`.
    async fn process(&self, tx: &LedgerTransaction, cursor_eligible: bool) {
        if self.store.was_tx_checked(&tx.hash).await.unwrap_or(false) {
            return;
        }

        let mut all_succeeded = true;
        for transfer in &tx.transfers {
            if transfer.memo.as_deref() != Some(SETTLEMENT_MEMO) {
                continue;
            }
            let sid = match self
                .store
                .reverse_lookup_settlement_account_by_peer(&transfer.src)
                .await
                .unwrap_or(None)
            {
                Some(sid) => sid,
                None => continue,
            };
            if transfer.dst != self.config.self_ledger_account || transfer.asset != self.config.asset {
                continue;
            }

            let quantity = SettlementQuantity::new(transfer.amount.clone(), self.config.asset_scale);
            if let Err(err) = self.connector.notify_incoming_settlement(&sid, &quantity).await {
                warn!(tx_hash = %tx.hash, sid = %sid, error = %err, "failed to notify connector of incoming settlement");
                all_succeeded = false;
                break;
            }
            info!(tx_hash = %tx.hash, sid = %sid, amount = %quantity.amount, "notified connector of incoming settlement");
        }

        if all_succeeded {
            let _ = self.store.save_checked_tx(&tx.hash).await;
            let _ = self.store.remove_unchecked_tx(&tx.hash).await;
            if cursor_eligible {
                let _ = self.store.set_last_checked_tx_hash(&tx.hash).await;
            }
        } else {
            let _ = self.store.save_unchecked_tx(&tx.hash).await;
        }
    }
}
