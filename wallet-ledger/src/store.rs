//! Wallet store contract
//!
//! The store is the only place the non-negative-balance invariant is
//! enforced. Two backends implement it: [`MemoryStore`](crate::MemoryStore)
//! and [`RocksStore`](crate::RocksStore). Both give the same guarantees:
//!
//! - `apply` is all-or-nothing: a batch that would drive any wallet negative
//!   is rejected whole with [`Error::InsufficientFunds`]
//! - conflicting `apply` calls (overlapping wallet keys) are serialized by
//!   per-wallet locks taken in ascending [`WalletKey`] order
//! - readers never observe a partially-applied batch
//! - `history` returns entries in insertion order (batched entries may share
//!   a timestamp, so insertion order is canonical)

use crate::{
    error::{Error, Result},
    privacy::Commitment,
    types::{LedgerEntry, Page, Wallet, WalletKey},
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Storage contract for wallets and their entry logs
///
/// `apply` computes a commitment for every written entry and for each
/// wallet's post-batch state, and persists them next to the records. Reads
/// verify the stored payload against the stored commitment and fail closed
/// with [`Error::Integrity`] on a mismatch, so at-rest tampering with a
/// private payload surfaces instead of flowing through.
pub trait WalletStore: Send + Sync {
    /// Get a wallet, zero-valued if it has never been referenced
    ///
    /// An unseen key is not an error; a stored wallet that no longer
    /// matches its commitment is.
    fn get_wallet(&self, key: &WalletKey) -> Result<Wallet>;

    /// Apply a batch of entries as a single atomic unit
    fn apply(&self, entries: Vec<LedgerEntry>) -> Result<()>;

    /// Wallet history in insertion order
    fn history(&self, key: &WalletKey, page: Page) -> Result<Vec<LedgerEntry>>;

    /// Commitment persisted with the wallet's last write, if any
    fn wallet_commitment(&self, key: &WalletKey) -> Result<Option<Commitment>>;

    /// Commitment persisted when the entry was applied, if any
    fn entry_commitment(&self, entry_id: &Uuid) -> Result<Option<Commitment>>;
}

/// Net delta per wallet for a batch, plus the distinct keys in lock order
///
/// Shared by both backends so the validation semantics cannot drift.
pub(crate) struct BatchPlan {
    /// Distinct wallet keys, ascending (the lock acquisition order)
    pub keys: Vec<WalletKey>,
    /// Net delta the batch applies to each wallet
    pub net_deltas: BTreeMap<WalletKey, Decimal>,
}

pub(crate) fn plan_batch(entries: &[LedgerEntry]) -> Result<BatchPlan> {
    if entries.is_empty() {
        return Err(Error::InvalidBatch("empty batch".to_string()));
    }

    let mut net_deltas: BTreeMap<WalletKey, Decimal> = BTreeMap::new();
    for entry in entries {
        *net_deltas
            .entry(entry.wallet_key.clone())
            .or_insert(Decimal::ZERO) += entry.delta;
    }

    let keys = net_deltas.keys().cloned().collect();
    Ok(BatchPlan { keys, net_deltas })
}

/// Check the folded balances; first wallet that would go negative fails the
/// whole batch
pub(crate) fn check_non_negative(
    plan: &BatchPlan,
    balance_of: impl Fn(&WalletKey) -> Decimal,
) -> Result<()> {
    for (key, net) in &plan.net_deltas {
        let balance = balance_of(key);
        if balance + net < Decimal::ZERO {
            return Err(Error::InsufficientFunds {
                key: key.clone(),
                balance,
                requested: -*net,
            });
        }
    }
    Ok(())
}
