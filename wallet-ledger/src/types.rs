//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode for storage and commitments)
//! - Exact arithmetic (Decimal for money)
//! - Append-only history (entries are never mutated)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Entity class the ledger tracks wallets for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// End user receiving a bounty share
    User,
    /// Agent that facilitated the purchase
    Agent,
    /// Registry operator that served the offer
    RegistryOperator,
    /// Merchant funding the bounty
    Merchant,
}

impl EntityClass {
    /// Wire name of the class
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::User => "user",
            EntityClass::Agent => "agent",
            EntityClass::RegistryOperator => "registry_operator",
            EntityClass::Merchant => "merchant",
        }
    }

    /// Parse from wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(EntityClass::User),
            "agent" => Some(EntityClass::Agent),
            "registry_operator" => Some(EntityClass::RegistryOperator),
            "merchant" => Some(EntityClass::Merchant),
            _ => None,
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wallet identifier: one wallet per (entity class, entity id)
///
/// `Ord` on this type is the global lock order used by `apply` when a batch
/// touches multiple wallets.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WalletKey {
    /// Entity class
    pub class: EntityClass,
    /// Opaque entity id (issuance/verification is out of scope)
    pub id: String,
}

impl WalletKey {
    /// Create a new wallet key
    pub fn new(class: EntityClass, id: impl Into<String>) -> Self {
        Self {
            class,
            id: id.into(),
        }
    }
}

impl fmt::Display for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.id)
    }
}

/// Why a ledger entry moved funds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    /// Opening credit applied from fixture/funding configuration
    Funding,
    /// Bounty reserved against a merchant wallet at checkout initiation
    Reservation,
    /// Bounty share credited to a recipient at settlement
    SettlementCredit,
    /// Merchant debit covering a split that overshoots the reservation
    SettlementDebit,
    /// Reserved bounty returned to the merchant after a failed order
    Reversal,
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryReason::Funding => "funding",
            EntryReason::Reservation => "reservation",
            EntryReason::SettlementCredit => "settlement_credit",
            EntryReason::SettlementDebit => "settlement_debit",
            EntryReason::Reversal => "reversal",
        };
        write!(f, "{}", s)
    }
}

/// Immutable record of one balance mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub entry_id: Uuid,

    /// Wallet this entry applies to
    pub wallet_key: WalletKey,

    /// Signed amount (positive credits, negative debits)
    pub delta: Decimal,

    /// Why the mutation happened
    pub reason: EntryReason,

    /// Order id this entry correlates to
    pub correlation_id: String,

    /// Entry creation timestamp
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a new entry stamped now
    pub fn new(
        wallet_key: WalletKey,
        delta: Decimal,
        reason: EntryReason,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            wallet_key,
            delta,
            reason,
            correlation_id: correlation_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Canonical bytes for commitments and storage
    pub fn canonical_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("serialization cannot fail")
    }
}

/// Per-entity balance and running totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet key
    pub key: WalletKey,

    /// Current balance; always the fold of the wallet's entries
    pub balance: Decimal,

    /// Sum of all credits ever applied
    pub total_credited: Decimal,

    /// Sum of all debits ever applied (stored positive)
    pub total_debited: Decimal,

    /// Number of entries applied
    pub transaction_count: u64,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Zero-valued wallet for a key that has never been referenced
    pub fn zeroed(key: WalletKey) -> Self {
        Self {
            key,
            balance: Decimal::ZERO,
            total_credited: Decimal::ZERO,
            total_debited: Decimal::ZERO,
            transaction_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Fold one entry into the wallet
    ///
    /// The store has already checked the non-negativity precondition for the
    /// whole batch before this is called.
    pub fn fold(&mut self, entry: &LedgerEntry) {
        debug_assert_eq!(self.key, entry.wallet_key);

        self.balance += entry.delta;
        if entry.delta >= Decimal::ZERO {
            self.total_credited += entry.delta;
        } else {
            self.total_debited -= entry.delta;
        }
        self.transaction_count += 1;
        self.updated_at = entry.created_at;
    }
}

/// History pagination
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    /// Entries to skip from the start of the wallet's history
    pub offset: usize,
    /// Maximum entries to return
    pub limit: usize,
}

impl Page {
    /// First `limit` entries
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}
