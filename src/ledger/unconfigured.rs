//! Placeholder [`LedgerClient`] wired into the binary until a real
//! implementation (speaking the target ledger's wire protocol, e.g. an
//! Iroha `torii` gate) is linked in. Every call fails with `LedgerError`,
//! so the startup liveness probe reports the adapter as unconfigured rather
//! than the process silently doing nothing.

use super::{LedgerClient, LedgerTransaction};
use crate::errors::LedgerError;
use crate::types::{AssetId, LedgerAccountId};
use async_trait::async_trait;
use num_bigint::BigUint;

pub struct UnconfiguredLedgerClient;

fn unconfigured() -> LedgerError {
    LedgerError::Transport(
        "no LedgerClient implementation is linked into this binary; supply one for your ledger's wire protocol"
            .to_owned(),
    )
}

#[async_trait]
impl LedgerClient for UnconfiguredLedgerClient {
    async fn get_account(&self, _account: &LedgerAccountId) -> Result<(), LedgerError> {
        Err(unconfigured())
    }

    async fn submit_transfer(
        &self,
        _from: &LedgerAccountId,
        _to: &LedgerAccountId,
        _asset: &AssetId,
        _memo: &str,
        _amount: BigUint,
    ) -> Result<(), LedgerError> {
        Err(unconfigured())
    }

    async fn list_account_asset_transactions(
        &self,
        _account: &LedgerAccountId,
        _asset: &AssetId,
        _page_size: u32,
        _cursor: Option<&str>,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        Err(unconfigured())
    }

    async fn list_transactions_by_hashes(
        &self,
        _hashes: &[String],
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        Err(unconfigured())
    }
}
