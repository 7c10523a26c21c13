//! The Outgoing Settlement Engine: turns a connector-reported incoming
//! payment into a ledger transfer, with leftover accounting and idempotent
//! replay. Grounded on the shape of the teacher's `ethereum_ledger::engine`
//! together with `interledger_settlement::core::types::SettlementEngine`, but
//! collapsed to a single struct since this crate has exactly one ledger
//! backend per running instance rather than the teacher's generic-over-store
//! design.

use crate::errors::{ApiError, LedgerError};
use crate::ledger::LedgerClient;
use crate::scale::{scale_with_precision_loss, Convert, ConvertDetails};
use crate::store::SettlementStore;
use crate::types::{AssetId, AssetScale, LedgerAccountId, SettlementAccountId};
use num_bigint::BigUint;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Memo discriminator the Incoming Observer uses to recognize settlement
/// transfers on the shared ledger. Mandatory protocol constant.
pub const SETTLEMENT_MEMO: &str = "ILP Settlement";

const SUBMIT_TRANSFER_MAX_ATTEMPTS: u32 = 10;
const SUBMIT_TRANSFER_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// The engine's fixed identity: its own ledger account, the asset it
/// settles, and the scale it settles at. Shared (read-only) across every
/// request.
#[derive(Clone)]
pub struct EngineConfig {
    pub self_ledger_account: LedgerAccountId,
    pub asset: AssetId,
    pub asset_scale: AssetScale,
}

/// Owns the store and ledger client handles and serializes `settle()`
/// through a single global critical section, per the spec's simplest-correct
/// resolution over a per-key mutex map.
pub struct SettlementEngine<S, L> {
    pub store: Arc<S>,
    pub ledger: Arc<L>,
    pub config: EngineConfig,
    critical_section: Mutex<()>,
}

impl<S, L> SettlementEngine<S, L>
where
    S: SettlementStore,
    L: LedgerClient,
{
    pub fn new(store: Arc<S>, ledger: Arc<L>, config: EngineConfig) -> Self {
        SettlementEngine {
            store,
            ledger,
            config,
            critical_section: Mutex::new(()),
        }
    }

    /// Implements the §4.D algorithm. Returns the HTTP status to answer the
    /// connector's settlement request with.
    pub async fn settle(
        &self,
        sid: &SettlementAccountId,
        idempotency_key: &str,
        incoming_amount: BigUint,
        incoming_scale: AssetScale,
    ) -> Result<u16, ApiError> {
        let _guard = self.critical_section.lock().await;

        if let Some(status) = self.store.get_request_status(idempotency_key).await? {
            debug!(idempotency_key = %idempotency_key, status, "replaying idempotent settlement response");
            return Ok(status);
        }

        let peer = self
            .store
            .get_peer_ledger_account(sid)
            .await?
            .ok_or_else(ApiError::peer_not_found)?;

        let leftover = self.store.get_leftover(sid).await?;
        let total = incoming_amount + leftover;
        let (representable, new_leftover) = scale_with_precision_loss(
            total,
            incoming_scale,
            self.config.asset_scale,
        );

        let ledger_units = representable
            .normalize_scale(ConvertDetails {
                from: incoming_scale,
                to: self.config.asset_scale,
            })
            .map_err(|_| ApiError::internal_server_error().detail("scale conversion overflowed"))?;

        if ledger_units == BigUint::default() {
            self.store.save_leftover(sid, new_leftover).await?;
            self.store.save_request_status(idempotency_key, 201).await?;
            return Ok(201);
        }

        if let Err(err) = self.submit_transfer_with_retry(&peer, ledger_units).await {
            error!(sid = %sid, idempotency_key = %idempotency_key, error = %err, "outgoing settlement exhausted retries");
            return Err(err.into());
        }

        self.store.save_leftover(sid, new_leftover).await?;
        self.store.save_request_status(idempotency_key, 201).await?;
        info!(sid = %sid, idempotency_key = %idempotency_key, "settlement committed");
        Ok(201)
    }

    /// Ten attempts, exponential backoff doubling from one second. Hand
    /// written rather than built on a generic retry combinator because the
    /// doubling policy is a fixed part of the protocol, not a tunable.
    async fn submit_transfer_with_retry(
        &self,
        peer: &LedgerAccountId,
        amount: BigUint,
    ) -> Result<(), LedgerError> {
        let mut delay = SUBMIT_TRANSFER_INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .ledger
                .submit_transfer(
                    &self.config.self_ledger_account,
                    peer,
                    &self.config.asset,
                    SETTLEMENT_MEMO,
                    amount.clone(),
                )
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= SUBMIT_TRANSFER_MAX_ATTEMPTS => return Err(err),
                Err(err) => {
                    warn!(attempt, error = %err, "ledger transfer attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    /// Account-setup half of the control surface's `POST /accounts`: records
    /// the peer's ledger account once the handshake response is known.
    pub async fn link_peer_account(
        &self,
        sid: &SettlementAccountId,
        peer_ledger_account: &LedgerAccountId,
    ) -> Result<(), ApiError> {
        self.store
            .save_peer_ledger_account(sid, peer_ledger_account)
            .await?;
        Ok(())
    }

    pub async fn peer_account_known(&self, sid: &SettlementAccountId) -> Result<bool, ApiError> {
        Ok(self.store.get_peer_ledger_account(sid).await?.is_some())
    }

    pub async fn delete_account(&self, sid: &SettlementAccountId) -> Result<(), ApiError> {
        if !self.store.exists_settlement_account(sid).await? {
            return Err(ApiError::internal_server_error().detail("unknown settlement account"));
        }
        self.store.delete_settlement_account(sid).await?;
        Ok(())
    }

    /// Re-scales a ledger-observed integer amount back up to the engine's
    /// reporting scale, the inverse direction of the one used in `settle`.
    pub fn parse_ledger_amount(amount: &str) -> Result<BigUint, ApiError> {
        BigUint::from_str(amount)
            .map_err(|_| ApiError::bad_request().detail("malformed ledger amount"))
    }
}
