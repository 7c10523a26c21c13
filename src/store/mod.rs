//! The Store: durable key-value state behind an `async_trait`, following the
//! split the teacher uses between a Redis-backed production store
//! (`EngineRedisStore`) and in-memory test doubles.

pub mod memory;
#[cfg(feature = "redis-store")]
pub mod redis_store;

use crate::errors::StoreError;
use crate::types::{LedgerAccountId, SettlementAccountId};
use async_trait::async_trait;
use num_bigint::BigUint;

/// Durable, synchronously-consistent key-value state for the engine.
///
/// `settle()` (see [`crate::engine::SettlementEngine`]) composes several of
/// these calls into one atomic unit under its own mutual-exclusion region;
/// the store itself does not provide transactions across calls.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn get_peer_ledger_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<Option<LedgerAccountId>, StoreError>;

    /// Overwrite is permitted only if absent or equal; reassignment to a
    /// *different* ledger account is a programming error and is rejected.
    async fn save_peer_ledger_account(
        &self,
        sid: &SettlementAccountId,
        laid: &LedgerAccountId,
    ) -> Result<(), StoreError>;

    async fn exists_settlement_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<bool, StoreError>;

    /// Removes the peer mapping, the reverse peer->sid index, and the
    /// leftover for `sid`. Does not touch idempotency records or the
    /// transaction sets, which are global to the instance.
    async fn delete_settlement_account(&self, sid: &SettlementAccountId)
        -> Result<(), StoreError>;

    /// Maintained alongside `save_peer_ledger_account`/
    /// `delete_settlement_account` so the Incoming Observer can classify
    /// inbound transfers by source account.
    async fn reverse_lookup_settlement_account_by_peer(
        &self,
        laid: &LedgerAccountId,
    ) -> Result<Option<SettlementAccountId>, StoreError>;

    async fn get_request_status(&self, key: &str) -> Result<Option<u16>, StoreError>;

    /// MUST be called exactly once per idempotency key.
    async fn save_request_status(&self, key: &str, status: u16) -> Result<(), StoreError>;

    /// Zero if absent.
    async fn get_leftover(&self, sid: &SettlementAccountId) -> Result<BigUint, StoreError>;

    async fn save_leftover(
        &self,
        sid: &SettlementAccountId,
        value: BigUint,
    ) -> Result<(), StoreError>;

    async fn get_last_checked_tx_hash(&self) -> Result<Option<String>, StoreError>;

    async fn set_last_checked_tx_hash(&self, hash: &str) -> Result<(), StoreError>;

    async fn was_tx_checked(&self, hash: &str) -> Result<bool, StoreError>;

    async fn save_checked_tx(&self, hash: &str) -> Result<(), StoreError>;

    async fn save_unchecked_tx(&self, hash: &str) -> Result<(), StoreError>;

    async fn get_unchecked_tx_hashes(&self) -> Result<Vec<String>, StoreError>;

    async fn remove_unchecked_tx(&self, hash: &str) -> Result<(), StoreError>;
}
