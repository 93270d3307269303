//! Receipt and settlement persistence
//!
//! Both tables are keyed by `order_id` and store the commitment computed
//! when the record was written; read paths verify against that stored value,
//! never against a freshly recomputed one. The memory implementation backs
//! the services directly; a durable implementation can sit behind the same
//! trait without changing either service.

use crate::types::{AttributionReceipt, ReceiptStatus, SettlementRecord};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use wallet_ledger::Commitment;

/// Storage contract for receipts and settlements
pub trait AttributionRepo: Send + Sync {
    /// Receipt for an order with its write-time commitment, if one exists
    fn receipt(&self, order_id: &str) -> Option<(AttributionReceipt, Commitment)>;

    /// Store a new receipt and the commitment over its private projection
    /// (caller has already checked uniqueness under the order lock)
    fn insert_receipt(&self, receipt: AttributionReceipt, commitment: Commitment);

    /// Transition a receipt's status
    ///
    /// Status is part of the public projection, so the stored commitment
    /// stays valid across transitions.
    fn set_receipt_status(&self, order_id: &str, status: ReceiptStatus);

    /// Settlement for an order with its write-time commitment, if applied
    fn settlement(&self, order_id: &str) -> Option<(SettlementRecord, Commitment)>;

    /// Store an applied settlement and its commitment
    fn insert_settlement(&self, record: SettlementRecord, commitment: Commitment);

    /// All stored receipts, for aggregate reporting
    fn receipts(&self) -> Vec<AttributionReceipt>;

    /// All applied settlements, for aggregate reporting
    fn settlements(&self) -> Vec<SettlementRecord>;
}

/// In-memory repository
#[derive(Debug, Default)]
pub struct MemoryRepo {
    receipts: DashMap<String, (AttributionReceipt, Commitment)>,
    settlements: DashMap<String, (SettlementRecord, Commitment)>,
}

impl MemoryRepo {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttributionRepo for MemoryRepo {
    fn receipt(&self, order_id: &str) -> Option<(AttributionReceipt, Commitment)> {
        self.receipts.get(order_id).map(|r| r.clone())
    }

    fn insert_receipt(&self, receipt: AttributionReceipt, commitment: Commitment) {
        self.receipts
            .insert(receipt.order_id.clone(), (receipt, commitment));
    }

    fn set_receipt_status(&self, order_id: &str, status: ReceiptStatus) {
        if let Some(mut stored) = self.receipts.get_mut(order_id) {
            stored.0.status = status;
        }
    }

    fn settlement(&self, order_id: &str) -> Option<(SettlementRecord, Commitment)> {
        self.settlements.get(order_id).map(|s| s.clone())
    }

    fn insert_settlement(&self, record: SettlementRecord, commitment: Commitment) {
        self.settlements
            .insert(record.order_id.clone(), (record, commitment));
    }

    fn receipts(&self) -> Vec<AttributionReceipt> {
        self.receipts.iter().map(|r| r.value().0.clone()).collect()
    }

    fn settlements(&self) -> Vec<SettlementRecord> {
        self.settlements
            .iter()
            .map(|s| s.value().0.clone())
            .collect()
    }
}

/// Per-order async mutexes shared by the receipt and settlement services
///
/// Serializes concurrent requests for the same `order_id`; requests for
/// different orders never contend.
#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderLocks {
    /// Create an empty lock registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one order
    pub async fn acquire(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(order_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
