//! Read-side queries over wallets and ledger history
//!
//! Every payload leaves through the privacy codec: callers get sealed
//! public/private pairs carrying the commitment the store persisted at write
//! time, and each payload is verified against that stored value before it is
//! returned. A verification failure surfaces as an integrity error instead
//! of data.

use crate::error::{map_integrity, Error, Result};
use std::sync::Arc;
use wallet_ledger::{
    Disclose, Page, PrivacyCodec, PrivateEntryView, PrivateWalletView, PublicEntryView,
    PublicWalletView, Sealed, WalletKey, WalletStore,
};

/// Sealed wallet projection
pub type SealedWallet = Sealed<PublicWalletView, PrivateWalletView>;

/// Sealed ledger entry projection
pub type SealedEntry = Sealed<PublicEntryView, PrivateEntryView>;

/// Read-side access to wallets and their histories
pub struct LedgerQuery<S> {
    store: Arc<S>,
    codec: Arc<PrivacyCodec>,
}

impl<S: WalletStore> LedgerQuery<S> {
    /// Create a new query facade
    pub fn new(store: Arc<S>, codec: Arc<PrivacyCodec>) -> Self {
        Self { store, codec }
    }

    /// Wallet state as a sealed public/private pair
    ///
    /// A wallet with no history comes back zeroed rather than as an error;
    /// everything else must match its stored write-time commitment.
    pub fn wallet_view(&self, key: &WalletKey) -> Result<SealedWallet> {
        let wallet = self.store.get_wallet(key).map_err(map_integrity)?;
        let (public, private) = wallet.disclose();
        match self.store.wallet_commitment(key).map_err(map_integrity)? {
            Some(stored) => {
                self.codec
                    .check(&wallet.record_id(), &private, &stored)
                    .map_err(map_integrity)?;
                Ok(Sealed {
                    public,
                    private,
                    commitment: stored,
                })
            }
            None if wallet.transaction_count == 0 => Ok(self.codec.seal_record(&wallet)?),
            None => Err(Error::Integrity(format!(
                "missing commitment for wallet {key}"
            ))),
        }
    }

    /// Ledger history for one wallet in insertion order
    ///
    /// Each entry is verified against the commitment stored when it was
    /// applied; a missing or mismatching commitment fails the whole read.
    pub fn history_view(&self, key: &WalletKey, page: Page) -> Result<Vec<SealedEntry>> {
        let entries = self.store.history(key, page).map_err(map_integrity)?;
        let mut sealed = Vec::with_capacity(entries.len());
        for entry in &entries {
            let stored = self
                .store
                .entry_commitment(&entry.entry_id)
                .map_err(map_integrity)?
                .ok_or_else(|| {
                    Error::Integrity(format!("missing commitment for entry {}", entry.entry_id))
                })?;
            let (public, private) = entry.disclose();
            self.codec
                .check(&entry.record_id(), &private, &stored)
                .map_err(map_integrity)?;
            sealed.push(Sealed {
                public,
                private,
                commitment: stored,
            });
        }
        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wallet_ledger::{EntityClass, EntryReason, LedgerEntry, MemoryStore};

    fn query_with_entries() -> (LedgerQuery<MemoryStore>, WalletKey) {
        let codec = Arc::new(PrivacyCodec::new([5u8; 32]));
        let store = Arc::new(MemoryStore::new(codec.clone()));
        let key = WalletKey::new(EntityClass::Merchant, "toast_otto");
        store
            .apply(vec![
                LedgerEntry::new(key.clone(), dec!(500.00), EntryReason::Funding, "fixture"),
                LedgerEntry::new(key.clone(), dec!(-2.50), EntryReason::Reservation, "ord_1"),
            ])
            .unwrap();
        let query = LedgerQuery::new(store, codec);
        (query, key)
    }

    #[test]
    fn test_wallet_view_splits_amounts_from_ids() {
        let (query, key) = query_with_entries();
        let sealed = query.wallet_view(&key).unwrap();
        assert_eq!(sealed.public.id, "toast_otto");
        assert_eq!(sealed.public.transaction_count, 2);
        assert_eq!(sealed.private.balance, dec!(497.50));
        assert!(!sealed.commitment.as_str().is_empty());
    }

    #[test]
    fn test_unknown_wallet_is_zeroed() {
        let (query, _) = query_with_entries();
        let key = WalletKey::new(EntityClass::User, "usr_nobody");
        let sealed = query.wallet_view(&key).unwrap();
        assert_eq!(sealed.private.balance, dec!(0));
        assert_eq!(sealed.public.transaction_count, 0);
    }

    #[test]
    fn test_history_view_in_insertion_order() {
        let (query, key) = query_with_entries();
        let entries = query.history_view(&key, Page::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].public.reason, EntryReason::Funding);
        assert_eq!(entries[0].private.delta, dec!(500.00));
        assert_eq!(entries[1].public.reason, EntryReason::Reservation);
        assert_eq!(entries[1].private.delta, dec!(-2.50));
    }

    #[test]
    fn test_history_pagination() {
        let (query, key) = query_with_entries();
        let page = query.history_view(&key, Page { offset: 1, limit: 5 }).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].public.correlation_id, "ord_1");
    }

    #[test]
    fn test_views_return_stored_commitments() {
        let codec = Arc::new(PrivacyCodec::new([5u8; 32]));
        let store = Arc::new(MemoryStore::new(codec.clone()));
        let key = WalletKey::new(EntityClass::Merchant, "toast_otto");
        store
            .apply(vec![LedgerEntry::new(
                key.clone(),
                dec!(500.00),
                EntryReason::Funding,
                "fixture",
            )])
            .unwrap();
        let query = LedgerQuery::new(store.clone(), codec);

        let sealed = query.wallet_view(&key).unwrap();
        assert_eq!(
            sealed.commitment,
            store.wallet_commitment(&key).unwrap().unwrap()
        );

        let entries = query.history_view(&key, Page::default()).unwrap();
        let entry_id = store.history(&key, Page::default()).unwrap()[0].entry_id;
        assert_eq!(
            entries[0].commitment,
            store.entry_commitment(&entry_id).unwrap().unwrap()
        );
    }

    #[test]
    fn test_mismatched_codec_key_fails_closed() {
        let store_codec = Arc::new(PrivacyCodec::new([5u8; 32]));
        let store = Arc::new(MemoryStore::new(store_codec));
        let key = WalletKey::new(EntityClass::Merchant, "toast_otto");
        store
            .apply(vec![LedgerEntry::new(
                key.clone(),
                dec!(500.00),
                EntryReason::Funding,
                "fixture",
            )])
            .unwrap();

        // Stored commitments were written under a different key
        let query = LedgerQuery::new(store, Arc::new(PrivacyCodec::new([6u8; 32])));
        assert!(matches!(query.wallet_view(&key), Err(Error::Integrity(_))));
        assert!(matches!(
            query.history_view(&key, Page::default()),
            Err(Error::Integrity(_))
        ));
    }
}
