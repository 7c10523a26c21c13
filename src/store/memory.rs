//! `RwLock`-guarded in-memory [`SettlementStore`], used for tests and for
//! instances that don't need to survive a restart.

use super::SettlementStore;
use crate::errors::StoreError;
use crate::types::{LedgerAccountId, SettlementAccountId};
use async_trait::async_trait;
use num_bigint::BigUint;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Inner {
    peer_ledger_account: HashMap<SettlementAccountId, LedgerAccountId>,
    ledger_account_peer: HashMap<LedgerAccountId, SettlementAccountId>,
    leftovers: HashMap<SettlementAccountId, BigUint>,
    request_status: HashMap<String, u16>,
    last_checked_tx_hash: Option<String>,
    checked_tx: HashSet<String>,
    unchecked_tx: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }
}

#[async_trait]
impl SettlementStore for InMemoryStore {
    async fn get_peer_ledger_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<Option<LedgerAccountId>, StoreError> {
        Ok(self.inner.read().peer_ledger_account.get(sid).cloned())
    }

    async fn save_peer_ledger_account(
        &self,
        sid: &SettlementAccountId,
        laid: &LedgerAccountId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.peer_ledger_account.get(sid) {
            if existing != laid {
                return Err(StoreError::PeerReassignment);
            }
            return Ok(());
        }
        inner
            .peer_ledger_account
            .insert(sid.clone(), laid.clone());
        inner
            .ledger_account_peer
            .insert(laid.clone(), sid.clone());
        Ok(())
    }

    async fn exists_settlement_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<bool, StoreError> {
        Ok(self.inner.read().peer_ledger_account.contains_key(sid))
    }

    async fn delete_settlement_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if let Some(laid) = inner.peer_ledger_account.remove(sid) {
            inner.ledger_account_peer.remove(&laid);
        }
        inner.leftovers.remove(sid);
        Ok(())
    }

    async fn reverse_lookup_settlement_account_by_peer(
        &self,
        laid: &LedgerAccountId,
    ) -> Result<Option<SettlementAccountId>, StoreError> {
        Ok(self.inner.read().ledger_account_peer.get(laid).cloned())
    }

    async fn get_request_status(&self, key: &str) -> Result<Option<u16>, StoreError> {
        Ok(self.inner.read().request_status.get(key).copied())
    }

    async fn save_request_status(&self, key: &str, status: u16) -> Result<(), StoreError> {
        self.inner
            .write()
            .request_status
            .insert(key.to_owned(), status);
        Ok(())
    }

    async fn get_leftover(&self, sid: &SettlementAccountId) -> Result<BigUint, StoreError> {
        Ok(self
            .inner
            .read()
            .leftovers
            .get(sid)
            .cloned()
            .unwrap_or_else(BigUint::default))
    }

    async fn save_leftover(
        &self,
        sid: &SettlementAccountId,
        value: BigUint,
    ) -> Result<(), StoreError> {
        self.inner.write().leftovers.insert(sid.clone(), value);
        Ok(())
    }

    async fn get_last_checked_tx_hash(&self) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read().last_checked_tx_hash.clone())
    }

    async fn set_last_checked_tx_hash(&self, hash: &str) -> Result<(), StoreError> {
        self.inner.write().last_checked_tx_hash = Some(hash.to_owned());
        Ok(())
    }

    async fn was_tx_checked(&self, hash: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().checked_tx.contains(hash))
    }

    async fn save_checked_tx(&self, hash: &str) -> Result<(), StoreError> {
        self.inner.write().checked_tx.insert(hash.to_owned());
        Ok(())
    }

    async fn save_unchecked_tx(&self, hash: &str) -> Result<(), StoreError> {
        self.inner.write().unchecked_tx.insert(hash.to_owned());
        Ok(())
    }

    async fn get_unchecked_tx_hashes(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().unchecked_tx.iter().cloned().collect())
    }

    async fn remove_unchecked_tx(&self, hash: &str) -> Result<(), StoreError> {
        self.inner.write().unchecked_tx.remove(hash);
        Ok(())
    }
}
