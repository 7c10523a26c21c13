//! The Ledger Adapter: the trait boundary between this engine and the
//! external ledger client library (out of scope for this crate - consumed
//! only through this interface, the same posture the teacher's
//! `interledger-settlement-engines` takes toward `web3`/`EthereumLedgerTxSigner`
//! behind a generic type parameter).

pub mod unconfigured;

use crate::errors::LedgerError;
use crate::types::{AssetId, LedgerAccountId};
use async_trait::async_trait;
use num_bigint::BigUint;

/// A single transfer command inside a [`LedgerTransaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransferCommand {
    pub src: LedgerAccountId,
    pub dst: LedgerAccountId,
    pub asset: AssetId,
    /// Integer amount at the ledger's own asset scale, as a decimal-digit string.
    pub amount: String,
    pub memo: Option<String>,
}

/// A committed ledger transaction, exposing only what the engine needs to
/// classify it: a stable hash and the transfer commands it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub hash: String,
    pub transfers: Vec<LedgerTransferCommand>,
}

/// Abstracts the external ledger client. Implementations wrap whatever wire
/// protocol the real ledger speaks (e.g. an Iroha `torii` gate); this crate
/// never depends on that protocol directly.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Liveness/auth probe, called once at startup. Any failure is fatal.
    async fn get_account(&self, account: &LedgerAccountId) -> Result<(), LedgerError>;

    /// Submits a signed transfer. Resolves once the transfer has committed;
    /// returns a `LedgerError` on any terminal or transient failure
    /// (unreceived, expired, unrecognized status, transport exception).
    async fn submit_transfer(
        &self,
        from: &LedgerAccountId,
        to: &LedgerAccountId,
        asset: &AssetId,
        memo: &str,
        amount: BigUint,
    ) -> Result<(), LedgerError>;

    /// Returns transactions involving `account`/`asset` strictly after
    /// `cursor`, oldest first, up to `page_size`. `cursor = None` returns the
    /// oldest page.
    async fn list_account_asset_transactions(
        &self,
        account: &LedgerAccountId,
        asset: &AssetId,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<Vec<LedgerTransaction>, LedgerError>;

    /// Fetches transactions by hash, for re-checking previously-unchecked
    /// transactions whose connector notification had failed.
    async fn list_transactions_by_hashes(
        &self,
        hashes: &[String],
    ) -> Result<Vec<LedgerTransaction>, LedgerError>;
}
