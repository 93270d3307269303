//! Error types for the attribution services

use crate::types::ReceiptStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for attribution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Attribution errors
///
/// All variants are terminal and caller-visible; the core never retries a
/// financial operation on its own. Callers resubmit with the same `order_id`
/// to get idempotent behavior.
#[derive(Error, Debug)]
pub enum Error {
    /// Merchant wallet cannot cover the requested bounty
    #[error("merchant {merchant_id} underfunded: available {available}, requested {requested}")]
    MerchantUnderfunded {
        /// Merchant whose wallet was checked
        merchant_id: String,
        /// Balance at the time of the attempt
        available: Decimal,
        /// Bounty that was requested
        requested: Decimal,
    },

    /// Bounty amount must be strictly positive
    #[error("invalid bounty amount: {0}")]
    InvalidAmount(Decimal),

    /// No receipt exists for the order
    #[error("unknown order: {0}")]
    UnknownOrder(String),

    /// The order was already settled or reversed; first application wins
    #[error("duplicate settlement for order {order_id} (receipt is {status})")]
    DuplicateSettlement {
        /// Order that was already finalized
        order_id: String,
        /// Receipt status at the time of the duplicate
        status: ReceiptStatus,
    },

    /// Split amounts do not sum to the reserved bounty within epsilon
    #[error("split mismatch: reserved {reserved}, split sums to {actual}")]
    SplitMismatch {
        /// Bounty reserved at receipt time
        reserved: Decimal,
        /// Sum of the submitted split
        actual: Decimal,
    },

    /// Commitment verification failed on the read path; fail closed
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Wallet ledger error
    #[error("ledger error: {0}")]
    Ledger(#[from] wallet_ledger::Error),
}

/// Surface ledger integrity failures as this crate's own variant; everything
/// else stays wrapped
pub(crate) fn map_integrity(err: wallet_ledger::Error) -> Error {
    match err {
        wallet_ledger::Error::Integrity(msg) => Error::Integrity(msg),
        other => Error::Ledger(other),
    }
}
