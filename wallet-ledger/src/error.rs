//! Error types for the wallet ledger

use crate::types::WalletKey;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// A batch would drive a wallet balance below zero; nothing was applied
    #[error("insufficient funds in {key}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Wallet that would go negative
        key: WalletKey,
        /// Balance before the batch
        balance: Decimal,
        /// Net debit the batch asked for
        requested: Decimal,
    },

    /// Batch was empty or malformed
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// Commitment verification failed; the private payload cannot be trusted
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Storage error (RocksDB)
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
