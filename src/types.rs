//! Wire types and small value types shared across the engine, grounded on
//! `interledger_settlement::core::types` (`Quantity`).

use serde::{Deserialize, Serialize};

/// Opaque short string the connector uses to name a settlement account.
/// Assigned by the connector, never interpreted by this engine.
pub type SettlementAccountId = String;

/// Fully qualified identifier on the ledger, e.g. `name@domain`.
pub type LedgerAccountId = String;

/// Identifier of the asset this engine instance settles, `<code>#<domain>`.
pub type AssetId = String;

/// The number of decimal digits after the point an integer amount represents.
/// Valid range is `[0, 18]`.
pub type AssetScale = u8;

/// An amount denominated in some unit of a single, fungible asset, as sent to
/// and received from the connector. `amount` is encoded as a string so no
/// precision is lost on platforms without arbitrary-precision integers -
/// mirrors the RFC536 `Quantity` object verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SettlementQuantity {
    pub amount: String,
    pub scale: AssetScale,
}

impl SettlementQuantity {
    pub fn new(amount: impl ToString, scale: AssetScale) -> Self {
        SettlementQuantity {
            amount: amount.to_string(),
            scale,
        }
    }
}

/// Symmetric request/response payload exchanged during the peer-identity
/// handshake (`POST /accounts/{sid}/messages`). The field name is part of the
/// wire contract and must not be renamed.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PaymentDetailsMessage {
    pub iroha_account_id: LedgerAccountId,
}

/// Body of `POST /accounts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub id: SettlementAccountId,
}
