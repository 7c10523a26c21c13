//! Interledger settlement engine for an Iroha-backed ledger.
//!
//! Layout mirrors the teacher's own crate split: a Store seam (`store`), a
//! Ledger Adapter seam (`ledger`), the settlement algorithm itself
//! (`engine`), the periodic incoming-transfer watcher (`observer`), the
//! connector-facing HTTP control surface (`api`) and outbound client
//! (`client`), shared wire types (`types`) and error catalog (`errors`), and
//! fixed-point scale conversion (`scale`).

pub mod api;
pub mod client;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod observer;
pub mod scale;
pub mod store;
pub mod types;
