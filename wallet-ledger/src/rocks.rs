//! RocksDB-backed wallet store
//!
//! # Column families
//!
//! - `wallets` - current wallet state (key: `class:id`)
//! - `entries` - append-only entry log (key: entry_id)
//! - `indices` - insertion-ordered history index per wallet and an
//!   order-scoped correlation index
//! - `commitments` - write-time commitment per entry and per wallet state
//!
//! Index and commitment keys length-prefix their string segment, so a wallet
//! or correlation id that happens to contain another id as a prefix can
//! never match the other's scan range.
//!
//! Atomicity comes from a single RocksDB `WriteBatch` per `apply`; the
//! check-then-write section is serialized by the same ordered per-wallet
//! locks the in-memory backend uses. Reads recompute each private payload's
//! commitment and compare it to the stored one, failing closed on mismatch.

use crate::{
    config::Config,
    error::{Error, Result},
    privacy::{Commitment, Disclose, PrivacyCodec},
    store::{check_non_negative, plan_batch, WalletStore},
    types::{LedgerEntry, Page, Wallet, WalletKey},
};
use parking_lot::Mutex;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Direction, IteratorMode, Options,
    WriteBatch, DB,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const CF_WALLETS: &str = "wallets";
const CF_ENTRIES: &str = "entries";
const CF_INDICES: &str = "indices";
const CF_COMMITMENTS: &str = "commitments";

/// RocksDB-backed wallet store
pub struct RocksStore {
    db: DB,
    codec: Arc<PrivacyCodec>,
    locks: Mutex<HashMap<WalletKey, Arc<Mutex<()>>>>,
}

/// Length-prefixed string segment; unambiguous regardless of id content
fn push_segment(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

impl RocksStore {
    /// Open or create the database under `config.data_dir`
    ///
    /// Reads verify against commitments written with `codec`, so callers
    /// must open with the same commitment key across restarts.
    pub fn open(config: &Config, codec: Arc<PrivacyCodec>) -> Result<Self> {
        let path = &config.data_dir;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        // Write-heavy append workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_ENTRIES, Self::cf_options_log()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_state()),
            ColumnFamilyDescriptor::new(CF_COMMITMENTS, Self::cf_options_state()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = %path.display(), "opened wallet store");

        Ok(Self {
            db,
            codec,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn cf_options_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_state() -> Options {
        let mut opts = Options::default();
        // Frequently read, favor decode speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("column family {} not found", name)))
    }

    fn wallet_locks(&self, keys: &[WalletKey]) -> Vec<Arc<Mutex<()>>> {
        let mut registry = self.locks.lock();
        keys.iter()
            .map(|key| registry.entry(key.clone()).or_default().clone())
            .collect()
    }

    fn load_wallet(&self, key: &WalletKey) -> Result<Wallet> {
        let cf = self.cf_handle(CF_WALLETS)?;
        match self.db.get_cf(cf, key.to_string().as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(Wallet::zeroed(key.clone())),
        }
    }

    fn load_entry(&self, entry_id: &[u8]) -> Result<LedgerEntry> {
        let cf = self.cf_handle(CF_ENTRIES)?;
        let bytes = self
            .db
            .get_cf(cf, entry_id)?
            .ok_or_else(|| Error::Storage("index points at missing entry".to_string()))?;
        Ok(bincode::deserialize(&bytes)?)
    }

    fn load_commitment(&self, commitment_key: &[u8]) -> Result<Option<Commitment>> {
        let cf = self.cf_handle(CF_COMMITMENTS)?;
        Ok(self.db.get_cf(cf, commitment_key)?.map(|bytes| {
            Commitment(String::from_utf8_lossy(&bytes).into_owned())
        }))
    }

    fn verify_entry(&self, entry: &LedgerEntry) -> Result<()> {
        let stored = self
            .load_commitment(&Self::entry_commitment_key(&entry.entry_id))?
            .ok_or_else(|| {
                Error::Integrity(format!("missing commitment for entry {}", entry.entry_id))
            })?;
        let (_, private) = entry.disclose();
        self.codec.check(&entry.record_id(), &private, &stored)
    }

    fn history_index_key(key: &WalletKey, seq: u64) -> Vec<u8> {
        let mut index = Self::history_index_prefix(key);
        index.extend_from_slice(&seq.to_be_bytes());
        index
    }

    fn history_index_prefix(key: &WalletKey) -> Vec<u8> {
        let wallet = key.to_string();
        let mut prefix = Vec::with_capacity(wallet.len() + 5);
        prefix.push(b'w');
        push_segment(&mut prefix, &wallet);
        prefix
    }

    fn correlation_index_key(correlation_id: &str, entry_id: Uuid) -> Vec<u8> {
        let mut index = Self::correlation_index_prefix(correlation_id);
        index.extend_from_slice(entry_id.as_bytes());
        index
    }

    fn correlation_index_prefix(correlation_id: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(correlation_id.len() + 5);
        prefix.push(b'c');
        push_segment(&mut prefix, correlation_id);
        prefix
    }

    fn wallet_commitment_key(key: &WalletKey) -> Vec<u8> {
        let wallet = key.to_string();
        let mut commitment_key = Vec::with_capacity(wallet.len() + 5);
        commitment_key.push(b'w');
        push_segment(&mut commitment_key, &wallet);
        commitment_key
    }

    fn entry_commitment_key(entry_id: &Uuid) -> Vec<u8> {
        let mut commitment_key = Vec::with_capacity(17);
        commitment_key.push(b'e');
        commitment_key.extend_from_slice(entry_id.as_bytes());
        commitment_key
    }

    /// Entries recorded against one correlation (order) id, for audit
    pub fn entries_for_correlation(&self, correlation_id: &str) -> Result<Vec<LedgerEntry>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::correlation_index_prefix(correlation_id);

        let iter = self
            .db
            .iterator_cf(cf_indices, IteratorMode::From(&prefix, Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (index_key, _) = item?;
            if !index_key.starts_with(&prefix) {
                break;
            }
            let entry_id = &index_key[prefix.len()..];
            let entry = self.load_entry(entry_id)?;
            self.verify_entry(&entry)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl WalletStore for RocksStore {
    fn get_wallet(&self, key: &WalletKey) -> Result<Wallet> {
        let wallet = self.load_wallet(key)?;
        if wallet.transaction_count > 0 {
            let stored = self
                .load_commitment(&Self::wallet_commitment_key(key))?
                .ok_or_else(|| {
                    Error::Integrity(format!("missing commitment for wallet {}", key))
                })?;
            let (_, private) = wallet.disclose();
            self.codec.check(&wallet.record_id(), &private, &stored)?;
        }
        Ok(wallet)
    }

    fn apply(&self, entries: Vec<LedgerEntry>) -> Result<()> {
        let plan = plan_batch(&entries)?;

        let locks = self.wallet_locks(&plan.keys);
        let _guards: Vec<_> = locks.iter().map(|lock| lock.lock()).collect();

        let mut wallets: HashMap<WalletKey, Wallet> = HashMap::with_capacity(plan.keys.len());
        for key in &plan.keys {
            wallets.insert(key.clone(), self.load_wallet(key)?);
        }

        check_non_negative(&plan, |key| {
            wallets.get(key).map(|w| w.balance).unwrap_or(Decimal::ZERO)
        })?;

        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_entries = self.cf_handle(CF_ENTRIES)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let cf_commitments = self.cf_handle(CF_COMMITMENTS)?;

        let mut batch = WriteBatch::default();
        for entry in &entries {
            let wallet = wallets
                .get_mut(&entry.wallet_key)
                .expect("planned batch covers every key");
            let seq = wallet.transaction_count;
            wallet.fold(entry);

            batch.put_cf(cf_entries, entry.entry_id.as_bytes(), entry.canonical_bytes());
            batch.put_cf(
                cf_indices,
                Self::history_index_key(&entry.wallet_key, seq),
                entry.entry_id.as_bytes(),
            );
            batch.put_cf(
                cf_indices,
                Self::correlation_index_key(&entry.correlation_id, entry.entry_id),
                b"",
            );
            batch.put_cf(
                cf_commitments,
                Self::entry_commitment_key(&entry.entry_id),
                self.codec.seal_record(entry)?.commitment.as_str().as_bytes(),
            );
        }
        for (key, wallet) in &wallets {
            batch.put_cf(
                cf_wallets,
                key.to_string().as_bytes(),
                bincode::serialize(wallet)?,
            );
            batch.put_cf(
                cf_commitments,
                Self::wallet_commitment_key(key),
                self.codec.seal_record(wallet)?.commitment.as_str().as_bytes(),
            );
        }

        // Single atomic commit; guards drop only after it is durable
        self.db.write(batch)?;

        tracing::debug!(
            wallets = plan.keys.len(),
            entries = entries.len(),
            "batch applied"
        );

        Ok(())
    }

    fn history(&self, key: &WalletKey, page: Page) -> Result<Vec<LedgerEntry>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let prefix = Self::history_index_prefix(key);

        let iter = self
            .db
            .iterator_cf(cf_indices, IteratorMode::From(&prefix, Direction::Forward));

        let mut entries = Vec::new();
        for item in iter.skip(page.offset) {
            let (index_key, entry_id) = item?;
            if !index_key.starts_with(&prefix) {
                break;
            }
            if entries.len() >= page.limit {
                break;
            }
            let entry = self.load_entry(&entry_id)?;
            self.verify_entry(&entry)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn wallet_commitment(&self, key: &WalletKey) -> Result<Option<Commitment>> {
        self.load_commitment(&Self::wallet_commitment_key(key))
    }

    fn entry_commitment(&self, entry_id: &Uuid) -> Result<Option<Commitment>> {
        self.load_commitment(&Self::entry_commitment_key(entry_id))
    }
}
