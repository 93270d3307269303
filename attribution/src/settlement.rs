//! Settlement service
//!
//! Applies merchant postbacks against existing receipts. A success postback
//! distributes the reserved bounty across the split recipients; a failure
//! postback returns the whole reservation to the merchant. Either way the
//! receipt leaves `Reserved` exactly once; a second postback for the same
//! order is rejected with `DuplicateSettlement` regardless of its payload.

use crate::{
    error::{map_integrity, Error, Result},
    repo::{AttributionRepo, OrderLocks},
    types::{
        AttributionReceipt, PrivateSettlementView, PublicSettlementView, ReceiptStatus,
        SettlementRecord, SettlementRequest, SettlementStatus,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;
use wallet_ledger::{
    Disclose, EntryReason, LedgerEntry, Metrics, PrivacyCodec, Sealed, WalletStore,
};

/// Sealed settlement projection returned to callers
pub type SealedSettlement = Sealed<PublicSettlementView, PrivateSettlementView>;

/// Applies settlement postbacks exactly once per order
pub struct SettlementService<S> {
    store: Arc<S>,
    repo: Arc<dyn AttributionRepo>,
    codec: Arc<PrivacyCodec>,
    locks: Arc<OrderLocks>,
    metrics: Arc<Metrics>,
    epsilon: Decimal,
}

impl<S: WalletStore> SettlementService<S> {
    /// Create a new settlement service
    ///
    /// `epsilon` is the tolerance used when comparing the split sum against
    /// the reserved bounty; one minor currency unit in practice.
    pub fn new(
        store: Arc<S>,
        repo: Arc<dyn AttributionRepo>,
        codec: Arc<PrivacyCodec>,
        locks: Arc<OrderLocks>,
        metrics: Arc<Metrics>,
        epsilon: Decimal,
    ) -> Self {
        Self {
            store,
            repo,
            codec,
            locks,
            metrics,
            epsilon,
        }
    }

    /// Apply a settlement postback
    ///
    /// Errors: [`Error::UnknownOrder`] when no receipt exists,
    /// [`Error::DuplicateSettlement`] when the receipt already left
    /// `Reserved`, [`Error::SplitMismatch`] when a success split does not sum
    /// to the reservation within epsilon. On any error no wallet changes.
    pub async fn apply_settlement(&self, request: SettlementRequest) -> Result<SealedSettlement> {
        let _guard = self.locks.acquire(&request.order_id).await;

        let (receipt, receipt_commitment) = self
            .repo
            .receipt(&request.order_id)
            .ok_or_else(|| Error::UnknownOrder(request.order_id.clone()))?;

        // Refuse to settle against a receipt that no longer matches its
        // write-time commitment
        let (_, receipt_private) = receipt.disclose();
        self.codec
            .check(&receipt.record_id(), &receipt_private, &receipt_commitment)
            .map_err(map_integrity)?;

        if receipt.status != ReceiptStatus::Reserved {
            tracing::warn!(
                order_id = %request.order_id,
                status = %receipt.status,
                "duplicate settlement rejected"
            );
            return Err(Error::DuplicateSettlement {
                order_id: request.order_id,
                status: receipt.status,
            });
        }

        let (entries, final_status, record) = match request.status {
            SettlementStatus::Success => self.plan_distribution(&receipt, &request)?,
            SettlementStatus::Failure => Self::plan_reversal(&receipt, &request),
        };

        let entry_count = entries.len();
        let started = Instant::now();
        self.store.apply(entries)?;
        self.metrics
            .record_apply(entry_count, started.elapsed().as_secs_f64());

        let sealed = self.codec.seal_record(&record)?;
        self.repo.set_receipt_status(&receipt.order_id, final_status);
        self.repo
            .insert_settlement(record.clone(), sealed.commitment.clone());
        self.metrics.record_settlement();

        tracing::info!(
            order_id = %record.order_id,
            status = %record.status,
            final_status = %final_status,
            "settlement applied"
        );

        Ok(sealed)
    }

    /// Applied settlement for an order, if any (sealed projection)
    ///
    /// Verifies the stored record against its write-time commitment and
    /// fails closed with [`Error::Integrity`] on any mismatch.
    pub fn get_settlement(&self, order_id: &str) -> Result<Option<SealedSettlement>> {
        let Some((record, stored)) = self.repo.settlement(order_id) else {
            return Ok(None);
        };
        let (public, private) = record.disclose();
        self.codec
            .check(&record.record_id(), &private, &stored)
            .map_err(map_integrity)?;
        Ok(Some(Sealed {
            public,
            private,
            commitment: stored,
        }))
    }

    /// Entries distributing a successful bounty
    ///
    /// Credits every split recipient, then returns any rounding residual to
    /// the merchant so the credits sum to the reservation exactly.
    fn plan_distribution(
        &self,
        receipt: &AttributionReceipt,
        request: &SettlementRequest,
    ) -> Result<(Vec<LedgerEntry>, ReceiptStatus, SettlementRecord)> {
        for (&class, &share) in &request.split {
            if share < Decimal::ZERO {
                tracing::warn!(order_id = %request.order_id, %class, "negative split share");
                return Err(Error::InvalidAmount(share));
            }
        }

        let actual: Decimal = request.split.values().sum();
        let residual = receipt.bounty_amount - actual;
        if residual.abs() > self.epsilon {
            return Err(Error::SplitMismatch {
                reserved: receipt.bounty_amount,
                actual,
            });
        }

        let mut entries = Vec::with_capacity(request.split.len() + 1);
        for (&class, &share) in &request.split {
            if share == Decimal::ZERO {
                continue;
            }
            entries.push(LedgerEntry::new(
                receipt.wallet_key_for(class),
                share,
                EntryReason::SettlementCredit,
                receipt.order_id.clone(),
            ));
        }
        if residual > Decimal::ZERO {
            entries.push(LedgerEntry::new(
                receipt.merchant_key(),
                residual,
                EntryReason::SettlementCredit,
                receipt.order_id.clone(),
            ));
        } else if residual < Decimal::ZERO {
            entries.push(LedgerEntry::new(
                receipt.merchant_key(),
                residual,
                EntryReason::SettlementDebit,
                receipt.order_id.clone(),
            ));
        }

        let record = SettlementRecord {
            order_id: receipt.order_id.clone(),
            status: SettlementStatus::Success,
            order_total: request.order_total,
            split: request.split.clone(),
            created_at: Utc::now(),
        };
        Ok((entries, ReceiptStatus::Settled, record))
    }

    /// Single entry returning the reservation after a failed order
    fn plan_reversal(
        receipt: &AttributionReceipt,
        request: &SettlementRequest,
    ) -> (Vec<LedgerEntry>, ReceiptStatus, SettlementRecord) {
        let entries = vec![LedgerEntry::new(
            receipt.merchant_key(),
            receipt.bounty_amount,
            EntryReason::Reversal,
            receipt.order_id.clone(),
        )];
        let record = SettlementRecord {
            order_id: receipt.order_id.clone(),
            status: SettlementStatus::Failure,
            order_total: request.order_total,
            split: Default::default(),
            created_at: Utc::now(),
        };
        (entries, ReceiptStatus::Reversed, record)
    }
}
