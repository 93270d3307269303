//! Receipt service
//!
//! Creates attribution receipts, reserving the bounty from the merchant's
//! wallet at checkout initiation. Creation is idempotent on `order_id`: a
//! repeated request returns the stored receipt unchanged and performs no
//! second reservation.

use crate::{
    error::{map_integrity, Error, Result},
    repo::{AttributionRepo, OrderLocks},
    types::{AttributionReceipt, CreateReceipt, PrivateReceiptView, PublicReceiptView},
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use wallet_ledger::{
    Commitment, Disclose, EntryReason, LedgerEntry, Metrics, PrivacyCodec, Sealed, WalletStore,
};

/// Sealed receipt projection returned to callers
pub type SealedReceipt = Sealed<PublicReceiptView, PrivateReceiptView>;

/// Creates receipts and reserves bounties
pub struct ReceiptService<S> {
    store: Arc<S>,
    repo: Arc<dyn AttributionRepo>,
    codec: Arc<PrivacyCodec>,
    locks: Arc<OrderLocks>,
    metrics: Arc<Metrics>,
}

impl<S: WalletStore> ReceiptService<S> {
    /// Create a new receipt service
    pub fn new(
        store: Arc<S>,
        repo: Arc<dyn AttributionRepo>,
        codec: Arc<PrivacyCodec>,
        locks: Arc<OrderLocks>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            repo,
            codec,
            locks,
            metrics,
        }
    }

    /// Create an attribution receipt, reserving the bounty
    ///
    /// Side effects: one merchant wallet debit and one stored receipt.
    /// Errors: [`Error::InvalidAmount`] for a non-positive bounty,
    /// [`Error::MerchantUnderfunded`] when the merchant wallet cannot cover
    /// it (no receipt is created).
    pub async fn create_receipt(&self, request: CreateReceipt) -> Result<SealedReceipt> {
        if request.bounty_amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(request.bounty_amount));
        }

        let _guard = self.locks.acquire(&request.order_id).await;

        if let Some((existing, stored)) = self.repo.receipt(&request.order_id) {
            tracing::debug!(
                order_id = %existing.order_id,
                receipt_id = %existing.receipt_id,
                "receipt already exists, returning unchanged"
            );
            return self.seal_stored(&existing, stored);
        }

        let receipt = request.into_receipt();
        let reservation = LedgerEntry::new(
            receipt.merchant_key(),
            -receipt.bounty_amount,
            EntryReason::Reservation,
            receipt.order_id.clone(),
        );

        let started = Instant::now();
        match self.store.apply(vec![reservation]) {
            Ok(()) => self.metrics.record_apply(1, started.elapsed().as_secs_f64()),
            Err(wallet_ledger::Error::InsufficientFunds {
                balance, requested, ..
            }) => {
                self.metrics.record_insufficient_funds();
                tracing::warn!(
                    order_id = %receipt.order_id,
                    merchant_id = %receipt.merchant_id,
                    "merchant underfunded, no receipt created"
                );
                return Err(Error::MerchantUnderfunded {
                    merchant_id: receipt.merchant_id,
                    available: balance,
                    requested,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let sealed = self.codec.seal_record(&receipt)?;
        self.repo
            .insert_receipt(receipt.clone(), sealed.commitment.clone());
        self.metrics.record_receipt();

        tracing::info!(
            order_id = %receipt.order_id,
            receipt_id = %receipt.receipt_id,
            merchant_id = %receipt.merchant_id,
            "bounty reserved"
        );

        Ok(sealed)
    }

    /// Stored receipt for an order, if any (sealed projection)
    pub fn get_receipt(&self, order_id: &str) -> Result<Option<SealedReceipt>> {
        match self.repo.receipt(order_id) {
            Some((receipt, stored)) => Ok(Some(self.seal_stored(&receipt, stored)?)),
            None => Ok(None),
        }
    }

    /// Project a stored receipt, verifying it against its write-time
    /// commitment; fails closed with [`Error::Integrity`] on any mismatch
    fn seal_stored(&self, receipt: &AttributionReceipt, stored: Commitment) -> Result<SealedReceipt> {
        let (public, private) = receipt.disclose();
        self.codec
            .check(&receipt.record_id(), &private, &stored)
            .map_err(map_integrity)?;
        Ok(Sealed {
            public,
            private,
            commitment: stored,
        })
    }
}
