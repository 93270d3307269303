//! In-memory wallet store
//!
//! Deployment profile for tests and single-process runs. The concurrency
//! discipline matches [`RocksStore`](crate::RocksStore): per-wallet mutexes
//! acquired in ascending key order serialize conflicting `apply` calls, and
//! the commit happens under the data-plane write lock so readers see either
//! all of a batch or none of it. Commitments are computed at write time and
//! checked on every read, the same contract the durable backend gives.

use crate::{
    error::{Error, Result},
    privacy::{Commitment, Disclose, PrivacyCodec},
    store::{check_non_negative, plan_batch, WalletStore},
    types::{LedgerEntry, Page, Wallet, WalletKey},
};
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
struct WalletRecord {
    wallet: Wallet,
    commitment: Option<Commitment>,
    entries: Vec<LedgerEntry>,
}

impl WalletRecord {
    fn new(key: WalletKey) -> Self {
        Self {
            wallet: Wallet::zeroed(key),
            commitment: None,
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    wallets: HashMap<WalletKey, WalletRecord>,
    entry_commitments: HashMap<Uuid, Commitment>,
}

/// In-memory wallet store
#[derive(Debug)]
pub struct MemoryStore {
    codec: Arc<PrivacyCodec>,
    data: RwLock<Inner>,
    // Lock registry; entries are never removed (wallets are never deleted)
    locks: Mutex<HashMap<WalletKey, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    /// Create an empty store committing with the given codec
    ///
    /// Callers that verify reads must use a codec with the same key.
    pub fn new(codec: Arc<PrivacyCodec>) -> Self {
        Self {
            codec,
            data: RwLock::new(Inner::default()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn wallet_locks(&self, keys: &[WalletKey]) -> Vec<Arc<Mutex<()>>> {
        let mut registry = self.locks.lock();
        keys.iter()
            .map(|key| registry.entry(key.clone()).or_default().clone())
            .collect()
    }
}

impl WalletStore for MemoryStore {
    fn get_wallet(&self, key: &WalletKey) -> Result<Wallet> {
        let data = self.data.read();
        match data.wallets.get(key) {
            None => Ok(Wallet::zeroed(key.clone())),
            Some(record) => {
                if let Some(stored) = &record.commitment {
                    let (_, private) = record.wallet.disclose();
                    self.codec
                        .check(&record.wallet.record_id(), &private, stored)?;
                }
                Ok(record.wallet.clone())
            }
        }
    }

    fn apply(&self, entries: Vec<LedgerEntry>) -> Result<()> {
        let plan = plan_batch(&entries)?;

        // `plan.keys` is ascending, so guards are acquired in the global
        // lock order and conflicting batches cannot deadlock.
        let locks = self.wallet_locks(&plan.keys);
        let _guards: Vec<_> = locks.iter().map(|lock| lock.lock()).collect();

        {
            let data = self.data.read();
            check_non_negative(&plan, |key| {
                data.wallets
                    .get(key)
                    .map(|record| record.wallet.balance)
                    .unwrap_or(Decimal::ZERO)
            })?;
        }

        let mut data = self.data.write();
        let inner = &mut *data;
        for entry in entries {
            inner
                .entry_commitments
                .insert(entry.entry_id, self.codec.seal_record(&entry)?.commitment);
            let record = inner
                .wallets
                .entry(entry.wallet_key.clone())
                .or_insert_with(|| WalletRecord::new(entry.wallet_key.clone()));
            record.wallet.fold(&entry);
            record.entries.push(entry);
        }
        for key in &plan.keys {
            if let Some(record) = inner.wallets.get_mut(key) {
                record.commitment = Some(self.codec.seal_record(&record.wallet)?.commitment);
            }
        }

        Ok(())
    }

    fn history(&self, key: &WalletKey, page: Page) -> Result<Vec<LedgerEntry>> {
        let data = self.data.read();
        let Some(record) = data.wallets.get(key) else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for entry in record.entries.iter().skip(page.offset).take(page.limit) {
            let stored = data.entry_commitments.get(&entry.entry_id).ok_or_else(|| {
                Error::Integrity(format!("missing commitment for entry {}", entry.entry_id))
            })?;
            let (_, private) = entry.disclose();
            self.codec.check(&entry.record_id(), &private, stored)?;
            entries.push(entry.clone());
        }
        Ok(entries)
    }

    fn wallet_commitment(&self, key: &WalletKey) -> Result<Option<Commitment>> {
        let data = self.data.read();
        Ok(data
            .wallets
            .get(key)
            .and_then(|record| record.commitment.clone()))
    }

    fn entry_commitment(&self, entry_id: &Uuid) -> Result<Option<Commitment>> {
        let data = self.data.read();
        Ok(data.entry_commitments.get(entry_id).cloned())
    }
}
