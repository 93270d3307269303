//! Core types for attribution receipts and settlements

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use wallet_ledger::{Disclose, EntityClass, WalletKey};

/// Receipt lifecycle state
///
/// `Reserved --success--> Settled` and `Reserved --failure--> Reversed` are
/// the only legal transitions; both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// Bounty reserved against the merchant wallet
    Reserved,
    /// Bounty distributed to recipients
    Settled,
    /// Reservation returned to the merchant after a failed order
    Reversed,
    /// Reservation lapsed without a postback
    Expired,
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReceiptStatus::Reserved => "reserved",
            ReceiptStatus::Settled => "settled",
            ReceiptStatus::Reversed => "reversed",
            ReceiptStatus::Expired => "expired",
        };
        write!(f, "{}", s)
    }
}

/// Attribution receipt: one bounty reservation per order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReceipt {
    /// Unique receipt ID (UUIDv7)
    pub receipt_id: Uuid,

    /// Offer being attributed
    pub offer_id: String,

    /// Order id; the idempotency key (exactly one receipt per order)
    pub order_id: String,

    /// Agent that facilitated the checkout
    pub agent_id: String,

    /// User making the purchase
    pub user_id: String,

    /// Registry operator that served the offer
    pub registry_operator_id: String,

    /// Merchant funding the bounty
    pub merchant_id: String,

    /// Reserved bounty amount
    pub bounty_amount: Decimal,

    /// Lifecycle state
    pub status: ReceiptStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AttributionReceipt {
    /// Merchant wallet the reservation debits
    pub fn merchant_key(&self) -> WalletKey {
        WalletKey::new(EntityClass::Merchant, self.merchant_id.clone())
    }

    /// Wallet a split share for `class` is credited to
    pub fn wallet_key_for(&self, class: EntityClass) -> WalletKey {
        let id = match class {
            EntityClass::User => &self.user_id,
            EntityClass::Agent => &self.agent_id,
            EntityClass::RegistryOperator => &self.registry_operator_id,
            EntityClass::Merchant => &self.merchant_id,
        };
        WalletKey::new(class, id.clone())
    }
}

/// Request to create an attribution receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReceipt {
    /// Offer being attributed
    pub offer_id: String,
    /// Unique order identifier
    pub order_id: String,
    /// Agent that initiated checkout
    pub agent_id: String,
    /// User making the purchase
    pub user_id: String,
    /// Registry operator that served the offer
    pub registry_operator_id: String,
    /// Merchant funding the bounty
    pub merchant_id: String,
    /// Bounty amount to reserve
    pub bounty_amount: Decimal,
}

impl CreateReceipt {
    pub(crate) fn into_receipt(self) -> AttributionReceipt {
        AttributionReceipt {
            receipt_id: Uuid::now_v7(),
            offer_id: self.offer_id,
            order_id: self.order_id,
            agent_id: self.agent_id,
            user_id: self.user_id,
            registry_operator_id: self.registry_operator_id,
            merchant_id: self.merchant_id,
            bounty_amount: self.bounty_amount,
            status: ReceiptStatus::Reserved,
            created_at: Utc::now(),
        }
    }
}

/// Merchant-confirmed order outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    /// Order completed; distribute the bounty
    Success,
    /// Order failed; return the reservation
    Failure,
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementStatus::Success => write!(f, "success"),
            SettlementStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Split of a bounty across recipient classes
pub type BountySplit = BTreeMap<EntityClass, Decimal>;

/// Settlement postback as submitted by the merchant side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Order being settled; must match an existing receipt
    pub order_id: String,
    /// Order outcome
    pub status: SettlementStatus,
    /// Total order value (informational; not the bounty)
    pub order_total: Decimal,
    /// Bounty split; must sum to the reserved bounty within epsilon
    pub split: BountySplit,
}

/// Applied settlement, at most one per order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Order id
    pub order_id: String,
    /// Outcome
    pub status: SettlementStatus,
    /// Total order value
    pub order_total: Decimal,
    /// Bounty split that was applied (empty for reversals)
    pub split: BountySplit,
    /// Application timestamp
    pub created_at: DateTime<Utc>,
}

/// Aggregate protocol activity, derived from stored receipts and settlements
///
/// Amounts only; no per-wallet balances, so the view is safe to expose
/// alongside the public projections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Receipts ever created
    pub receipts_total: u64,
    /// Receipts still holding a reservation
    pub receipts_reserved: u64,
    /// Receipts settled successfully
    pub receipts_settled: u64,
    /// Receipts reversed after a failed order
    pub receipts_reversed: u64,
    /// Receipts that lapsed without a postback
    pub receipts_expired: u64,
    /// Settlements applied (success and failure)
    pub settlements_total: u64,
    /// Bounty currently held in open reservations
    pub bounty_reserved: Decimal,
    /// Bounty paid out through successful settlements
    pub bounty_distributed: Decimal,
    /// Distributed bounty per recipient class
    pub distributed_by_class: BTreeMap<EntityClass, Decimal>,
}

// Public/private projections

/// Public projection of a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicReceiptView {
    /// Receipt id
    pub receipt_id: Uuid,
    /// Offer id
    pub offer_id: String,
    /// Order id
    pub order_id: String,
    /// Agent id
    pub agent_id: String,
    /// User id
    pub user_id: String,
    /// Registry operator id
    pub registry_operator_id: String,
    /// Merchant id
    pub merchant_id: String,
    /// Lifecycle state
    pub status: ReceiptStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Private projection of a receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateReceiptView {
    /// Reserved bounty amount
    pub bounty_amount: Decimal,
}

impl Disclose for AttributionReceipt {
    type Public = PublicReceiptView;
    type Private = PrivateReceiptView;

    fn record_id(&self) -> String {
        self.receipt_id.to_string()
    }

    fn disclose(&self) -> (Self::Public, Self::Private) {
        (
            PublicReceiptView {
                receipt_id: self.receipt_id,
                offer_id: self.offer_id.clone(),
                order_id: self.order_id.clone(),
                agent_id: self.agent_id.clone(),
                user_id: self.user_id.clone(),
                registry_operator_id: self.registry_operator_id.clone(),
                merchant_id: self.merchant_id.clone(),
                status: self.status,
                created_at: self.created_at,
            },
            PrivateReceiptView {
                bounty_amount: self.bounty_amount,
            },
        )
    }
}

/// Public projection of a settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSettlementView {
    /// Order id
    pub order_id: String,
    /// Outcome
    pub status: SettlementStatus,
    /// Application timestamp
    pub created_at: DateTime<Utc>,
}

/// Private projection of a settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateSettlementView {
    /// Total order value
    pub order_total: Decimal,
    /// Applied bounty split
    pub split: BountySplit,
}

impl Disclose for SettlementRecord {
    type Public = PublicSettlementView;
    type Private = PrivateSettlementView;

    fn record_id(&self) -> String {
        format!("settlement:{}", self.order_id)
    }

    fn disclose(&self) -> (Self::Public, Self::Private) {
        (
            PublicSettlementView {
                order_id: self.order_id.clone(),
                status: self.status,
                created_at: self.created_at,
            },
            PrivateSettlementView {
                order_total: self.order_total,
                split: self.split.clone(),
            },
        )
    }
}
