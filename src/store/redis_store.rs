//! Redis-backed [`SettlementStore`], grounded on `EngineRedisStore`: a
//! `MultiplexedConnection` plus `redis::pipe().atomic()` for the handful of
//! compound updates (account creation, account deletion).

use super::SettlementStore;
use crate::errors::StoreError;
use crate::types::{LedgerAccountId, SettlementAccountId};
use async_trait::async_trait;
use num_bigint::BigUint;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::str::FromStr;
use tracing::debug;

const PEER_LEDGER_ACCOUNT_KEY: &str = "peer_ledger_account";
const LEDGER_ACCOUNT_PEER_KEY: &str = "ledger_account_peer";
const LEFTOVER_KEY_PREFIX: &str = "leftover";
const REQUEST_STATUS_KEY: &str = "request_status";
const LAST_CHECKED_TX_HASH_KEY: &str = "last_checked_tx_hash";
const CHECKED_TX_KEY: &str = "checked_tx";
const UNCHECKED_TX_KEY: &str = "unchecked_tx";

fn leftover_key(sid: &str) -> String {
    format!("{}:{}", LEFTOVER_KEY_PREFIX, sid)
}

/// Builder object to create a Redis connection for the engine.
pub struct RedisStoreBuilder {
    redis_url: String,
}

impl RedisStoreBuilder {
    pub fn new(redis_url: String) -> Self {
        RedisStoreBuilder { redis_url }
    }

    pub async fn connect(&self) -> Result<RedisStore, StoreError> {
        let client = Client::open(self.redis_url.as_str())?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        debug!("connected to redis at {}", self.redis_url);
        Ok(RedisStore { connection })
    }
}

/// A [`SettlementStore`] backed by Redis.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

#[async_trait]
impl SettlementStore for RedisStore {
    async fn get_peer_ledger_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<Option<LedgerAccountId>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.hget(PEER_LEDGER_ACCOUNT_KEY, sid).await?;
        Ok(value)
    }

    async fn save_peer_ledger_account(
        &self,
        sid: &SettlementAccountId,
        laid: &LedgerAccountId,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let existing: Option<String> = conn.hget(PEER_LEDGER_ACCOUNT_KEY, sid).await?;
        if let Some(existing) = existing {
            if &existing != laid {
                return Err(StoreError::PeerReassignment);
            }
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(PEER_LEDGER_ACCOUNT_KEY, sid, laid)
            .ignore()
            .hset(LEDGER_ACCOUNT_PEER_KEY, laid, sid)
            .ignore();
        pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists_settlement_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.hexists(PEER_LEDGER_ACCOUNT_KEY, sid).await?;
        Ok(exists)
    }

    async fn delete_settlement_account(
        &self,
        sid: &SettlementAccountId,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let laid: Option<String> = conn.hget(PEER_LEDGER_ACCOUNT_KEY, sid).await?;
        let mut pipe = redis::pipe();
        pipe.atomic()
            .hdel(PEER_LEDGER_ACCOUNT_KEY, sid)
            .ignore()
            .del(leftover_key(sid))
            .ignore();
        if let Some(laid) = laid {
            pipe.hdel(LEDGER_ACCOUNT_PEER_KEY, laid).ignore();
        }
        pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn reverse_lookup_settlement_account_by_peer(
        &self,
        laid: &LedgerAccountId,
    ) -> Result<Option<SettlementAccountId>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.hget(LEDGER_ACCOUNT_PEER_KEY, laid).await?;
        Ok(value)
    }

    async fn get_request_status(&self, key: &str) -> Result<Option<u16>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<u16> = conn.hget(REQUEST_STATUS_KEY, key).await?;
        Ok(value)
    }

    async fn save_request_status(&self, key: &str, status: u16) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.hset(REQUEST_STATUS_KEY, key, status).await?;
        Ok(())
    }

    async fn get_leftover(&self, sid: &SettlementAccountId) -> Result<BigUint, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(leftover_key(sid)).await?;
        Ok(value
            .and_then(|v| BigUint::from_str(&v).ok())
            .unwrap_or_default())
    }

    async fn save_leftover(
        &self,
        sid: &SettlementAccountId,
        value: BigUint,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.set(leftover_key(sid), value.to_string()).await?;
        Ok(())
    }

    async fn get_last_checked_tx_hash(&self) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(LAST_CHECKED_TX_HASH_KEY).await?;
        Ok(value)
    }

    async fn set_last_checked_tx_hash(&self, hash: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.set(LAST_CHECKED_TX_HASH_KEY, hash).await?;
        Ok(())
    }

    async fn was_tx_checked(&self, hash: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let is_member: bool = conn.sismember(CHECKED_TX_KEY, hash).await?;
        Ok(is_member)
    }

    async fn save_checked_tx(&self, hash: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.sadd(CHECKED_TX_KEY, hash).await?;
        Ok(())
    }

    async fn save_unchecked_tx(&self, hash: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.sadd(UNCHECKED_TX_KEY, hash).await?;
        Ok(())
    }

    async fn get_unchecked_tx_hashes(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        let hashes: Vec<String> = conn.smembers(UNCHECKED_TX_KEY).await?;
        Ok(hashes)
    }

    async fn remove_unchecked_tx(&self, hash: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.srem(UNCHECKED_TX_KEY, hash).await?;
        Ok(())
    }
}
