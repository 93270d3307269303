//! Attribution and settlement services
//!
//! Ties commerce outcomes to the parties that caused them: a receipt
//! reserves a bounty from the merchant wallet when an agent initiates
//! checkout, and a settlement postback later distributes that bounty to the
//! user, agent, and registry operator (or returns it after a failed order).
//! Each order settles exactly once, and the reserve-then-distribute shape
//! means the merchant is never debited a second time at settlement.
//!
//! Wallet mutations go through [`wallet_ledger`]; everything exposed to
//! callers leaves as a sealed public/private pair with a verifiable
//! commitment.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod manager;
pub mod query;
pub mod receipts;
pub mod repo;
pub mod settlement;
pub mod types;

// Re-exports
pub use config::{AppConfig, FixtureWallet};
pub use error::{Error, Result};
pub use manager::AttributionManager;
pub use query::{LedgerQuery, SealedEntry, SealedWallet};
pub use receipts::{ReceiptService, SealedReceipt};
pub use repo::{AttributionRepo, MemoryRepo, OrderLocks};
pub use settlement::{SealedSettlement, SettlementService};
pub use types::{
    AttributionReceipt, BountySplit, CreateReceipt, LedgerStats, PrivateReceiptView,
    PrivateSettlementView, PublicReceiptView, PublicSettlementView, ReceiptStatus,
    SettlementRecord, SettlementRequest, SettlementStatus,
};
