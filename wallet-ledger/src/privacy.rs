//! Privacy codec
//!
//! Splits ledger records into a public projection (ids, status, timestamps)
//! and a private projection (amounts, split details), and binds the private
//! payload to its record with a verifiable commitment: a keyed BLAKE3 hash
//! over `record_id || 0x00 || bincode(private)`. Recomputing the commitment
//! from the private payload must always match the stored value; a mismatch
//! signals tampering and the read path fails closed.
//!
//! At-rest protection of private payload bytes is pluggable through
//! [`Cipher`]; the commitment contract does not depend on which
//! implementation is plugged in.

use crate::{
    error::{Error, Result},
    types::{EntityClass, EntryReason, LedgerEntry, Wallet, WalletKey},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Commitment key length in bytes
pub const COMMITMENT_KEY_LEN: usize = 32;

/// Opaque commitment binding a private payload to its public record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment(pub(crate) String);

impl Commitment {
    /// Hex form of the commitment
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A record that can be projected into public and private views
pub trait Disclose {
    /// Publicly inspectable projection
    type Public: Serialize;
    /// Amount-bearing projection
    type Private: Serialize;

    /// Identifier the commitment binds the private payload to
    fn record_id(&self) -> String;

    /// Produce both projections
    fn disclose(&self) -> (Self::Public, Self::Private);
}

/// Public/private record pair as exposed to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sealed<P, V> {
    /// Public projection
    pub public: P,
    /// Private projection
    pub private: V,
    /// Commitment over the private projection
    pub commitment: Commitment,
}

/// At-rest protection for private payload bytes
pub trait Cipher: Send + Sync {
    /// Protect plaintext bytes
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>>;
    /// Recover plaintext bytes
    fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Identity cipher for tests and development
#[derive(Debug, Default)]
pub struct NoopCipher;

impl Cipher for NoopCipher {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

/// Splits records into public/private pairs and verifies commitments
#[derive(Clone)]
pub struct PrivacyCodec {
    key: [u8; COMMITMENT_KEY_LEN],
    cipher: Arc<dyn Cipher>,
}

impl PrivacyCodec {
    /// Codec with the given commitment key and no at-rest cipher
    pub fn new(key: [u8; COMMITMENT_KEY_LEN]) -> Self {
        Self::with_cipher(key, Arc::new(NoopCipher))
    }

    /// Codec with an explicit at-rest cipher
    pub fn with_cipher(key: [u8; COMMITMENT_KEY_LEN], cipher: Arc<dyn Cipher>) -> Self {
        Self { key, cipher }
    }

    /// Codec from a hex-encoded 32-byte key (the config format)
    pub fn from_hex_key(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key)
            .map_err(|e| Error::Config(format!("bad commitment key: {}", e)))?;
        let key: [u8; COMMITMENT_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| Error::Config("commitment key must be 32 bytes".to_string()))?;
        Ok(Self::new(key))
    }

    /// Codec with a random key; commitments do not survive a restart
    pub fn ephemeral() -> Self {
        Self::new(rand::random())
    }

    fn commitment_input<V: Serialize>(record_id: &str, private: &V) -> Result<Vec<u8>> {
        let mut input = Vec::with_capacity(record_id.len() + 64);
        input.extend_from_slice(record_id.as_bytes());
        input.push(0);
        input.extend_from_slice(&bincode::serialize(private)?);
        Ok(input)
    }

    /// Commitment over a private payload; deterministic for a given record
    pub fn commit<V: Serialize>(&self, record_id: &str, private: &V) -> Result<Commitment> {
        let input = Self::commitment_input(record_id, private)?;
        let hash = blake3::keyed_hash(&self.key, &input);
        Ok(Commitment(hash.to_hex().to_string()))
    }

    /// Recompute-and-compare; constant-time over the hash bytes
    pub fn verify<V: Serialize>(
        &self,
        record_id: &str,
        private: &V,
        commitment: &Commitment,
    ) -> Result<bool> {
        let input = Self::commitment_input(record_id, private)?;
        let recomputed = blake3::keyed_hash(&self.key, &input);
        let stored = match blake3::Hash::from_hex(commitment.as_str()) {
            Ok(hash) => hash,
            Err(_) => return Ok(false),
        };
        // blake3::Hash equality is constant-time
        Ok(recomputed == stored)
    }

    /// Verify, failing closed with [`Error::Integrity`] on mismatch
    pub fn check<V: Serialize>(
        &self,
        record_id: &str,
        private: &V,
        commitment: &Commitment,
    ) -> Result<()> {
        if self.verify(record_id, private, commitment)? {
            Ok(())
        } else {
            tracing::error!(record_id, "commitment mismatch, possible tampering");
            Err(Error::Integrity(format!(
                "commitment mismatch for record {}",
                record_id
            )))
        }
    }

    /// Project a record into its sealed public/private pair
    pub fn seal_record<R: Disclose>(&self, record: &R) -> Result<Sealed<R::Public, R::Private>> {
        let (public, private) = record.disclose();
        let commitment = self.commit(&record.record_id(), &private)?;
        Ok(Sealed {
            public,
            private,
            commitment,
        })
    }

    /// At-rest protection for serialized private payloads
    pub fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.seal(plaintext)
    }

    /// Inverse of [`protect`](Self::protect)
    pub fn expose(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.open(ciphertext)
    }
}

impl std::fmt::Debug for PrivacyCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the key
        f.debug_struct("PrivacyCodec").finish_non_exhaustive()
    }
}

// Wallet and entry projections live here; receipt/settlement projections
// live with their services.

/// Public projection of a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicWalletView {
    /// Entity class
    pub class: EntityClass,
    /// Entity id
    pub id: String,
    /// Number of entries applied
    pub transaction_count: u64,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

/// Private projection of a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateWalletView {
    /// Current balance
    pub balance: Decimal,
    /// Sum of all credits
    pub total_credited: Decimal,
    /// Sum of all debits
    pub total_debited: Decimal,
}

impl Disclose for Wallet {
    type Public = PublicWalletView;
    type Private = PrivateWalletView;

    fn record_id(&self) -> String {
        self.key.to_string()
    }

    fn disclose(&self) -> (Self::Public, Self::Private) {
        (
            PublicWalletView {
                class: self.key.class,
                id: self.key.id.clone(),
                transaction_count: self.transaction_count,
                updated_at: self.updated_at,
            },
            PrivateWalletView {
                balance: self.balance,
                total_credited: self.total_credited,
                total_debited: self.total_debited,
            },
        )
    }
}

/// Public projection of a ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicEntryView {
    /// Entry id
    pub entry_id: Uuid,
    /// Wallet the entry applies to
    pub wallet_key: WalletKey,
    /// Mutation reason
    pub reason: EntryReason,
    /// Correlated order id
    pub correlation_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Private projection of a ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateEntryView {
    /// Signed amount
    pub delta: Decimal,
}

impl Disclose for LedgerEntry {
    type Public = PublicEntryView;
    type Private = PrivateEntryView;

    fn record_id(&self) -> String {
        self.entry_id.to_string()
    }

    fn disclose(&self) -> (Self::Public, Self::Private) {
        (
            PublicEntryView {
                entry_id: self.entry_id,
                wallet_key: self.wallet_key.clone(),
                reason: self.reason,
                correlation_id: self.correlation_id.clone(),
                created_at: self.created_at,
            },
            PrivateEntryView { delta: self.delta },
        )
    }
}
