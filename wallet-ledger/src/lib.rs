//! Attribution wallet ledger
//!
//! Per-entity wallets with append-only entry logs for four entity classes
//! (user, agent, registry-operator, merchant), plus the privacy codec that
//! splits every exposed record into a public/private pair bound by a
//! verifiable commitment.
//!
//! # Invariants
//!
//! - Balance fold: a wallet's balance is always the sum of its entries
//! - Non-negativity: no batch may drive any wallet below zero; violating
//!   batches are rejected whole
//! - Append-only: entries are never modified or deleted
//! - Insertion order: history is returned in the order entries were applied

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod privacy;
pub mod rocks;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use metrics::Metrics;
pub use privacy::{
    Cipher, Commitment, Disclose, NoopCipher, PrivacyCodec, PrivateEntryView, PrivateWalletView,
    PublicEntryView, PublicWalletView, Sealed,
};
pub use rocks::RocksStore;
pub use store::WalletStore;
pub use types::{EntityClass, EntryReason, LedgerEntry, Page, Wallet, WalletKey};
