//! Top-level wiring for the attribution services
//!
//! Owns one wallet store, one receipt/settlement repository, and one privacy
//! codec, and exposes the full operation surface behind a single handle. The
//! services share per-order locks, so a receipt creation and a settlement
//! for the same order never interleave.

use crate::{
    config::AppConfig,
    error::Result,
    query::{LedgerQuery, SealedEntry, SealedWallet},
    receipts::{ReceiptService, SealedReceipt},
    repo::{AttributionRepo, MemoryRepo, OrderLocks},
    settlement::{SealedSettlement, SettlementService},
    types::{CreateReceipt, LedgerStats, ReceiptStatus, SettlementRequest, SettlementStatus},
};
use std::sync::Arc;
use wallet_ledger::{Metrics, Page, PrivacyCodec, WalletKey, WalletStore};

/// Attribution ledger facade
pub struct AttributionManager<S> {
    receipts: ReceiptService<S>,
    settlements: SettlementService<S>,
    query: LedgerQuery<S>,
    repo: Arc<dyn AttributionRepo>,
    metrics: Arc<Metrics>,
}

impl<S: WalletStore> AttributionManager<S> {
    /// Wire the services around an existing store and codec
    ///
    /// Funds the configured fixture wallets before returning.
    pub fn new(store: Arc<S>, codec: Arc<PrivacyCodec>, config: &AppConfig) -> Result<Self> {
        config.seed_fixtures(store.as_ref())?;

        let repo: Arc<dyn AttributionRepo> = Arc::new(MemoryRepo::new());
        let locks = Arc::new(OrderLocks::new());
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            wallet_ledger::Error::Config(format!("metrics registry: {}", e))
        })?);

        Ok(Self {
            receipts: ReceiptService::new(
                store.clone(),
                repo.clone(),
                codec.clone(),
                locks.clone(),
                metrics.clone(),
            ),
            settlements: SettlementService::new(
                store.clone(),
                repo.clone(),
                codec.clone(),
                locks,
                metrics.clone(),
                config.epsilon,
            ),
            query: LedgerQuery::new(store, codec),
            repo,
            metrics,
        })
    }

    /// Create an attribution receipt, reserving the bounty
    pub async fn create_receipt(&self, request: CreateReceipt) -> Result<SealedReceipt> {
        self.receipts.create_receipt(request).await
    }

    /// Receipt for an order, if any
    pub fn get_receipt(&self, order_id: &str) -> Result<Option<SealedReceipt>> {
        self.receipts.get_receipt(order_id)
    }

    /// Apply a settlement postback
    pub async fn apply_settlement(&self, request: SettlementRequest) -> Result<SealedSettlement> {
        self.settlements.apply_settlement(request).await
    }

    /// Applied settlement for an order, if any
    pub fn get_settlement(&self, order_id: &str) -> Result<Option<SealedSettlement>> {
        self.settlements.get_settlement(order_id)
    }

    /// Wallet state as a sealed public/private pair
    pub fn wallet_view(&self, key: &WalletKey) -> Result<SealedWallet> {
        self.query.wallet_view(key)
    }

    /// Ledger history for one wallet
    pub fn history_view(&self, key: &WalletKey, page: Page) -> Result<Vec<SealedEntry>> {
        self.query.history_view(key, page)
    }

    /// Aggregate activity across all stored receipts and settlements
    ///
    /// Counts and totals only; no wallet balances or per-order amounts.
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        for receipt in self.repo.receipts() {
            stats.receipts_total += 1;
            match receipt.status {
                ReceiptStatus::Reserved => {
                    stats.receipts_reserved += 1;
                    stats.bounty_reserved += receipt.bounty_amount;
                }
                ReceiptStatus::Settled => stats.receipts_settled += 1,
                ReceiptStatus::Reversed => stats.receipts_reversed += 1,
                ReceiptStatus::Expired => stats.receipts_expired += 1,
            }
        }
        for settlement in self.repo.settlements() {
            stats.settlements_total += 1;
            if settlement.status == SettlementStatus::Success {
                for (&class, &share) in &settlement.split {
                    stats.bounty_distributed += share;
                    *stats.distributed_by_class.entry(class).or_default() += share;
                }
            }
        }
        stats
    }

    /// Metrics collector shared by the services
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BountySplit;
    use rust_decimal_macros::dec;
    use wallet_ledger::{EntityClass, MemoryStore};

    fn demo_manager() -> AttributionManager<MemoryStore> {
        let codec = Arc::new(PrivacyCodec::new([5u8; 32]));
        AttributionManager::new(
            Arc::new(MemoryStore::new(codec.clone())),
            codec,
            &AppConfig::demo(),
        )
        .unwrap()
    }

    fn receipt_request(order_id: &str) -> CreateReceipt {
        CreateReceipt {
            offer_id: "ofr_001".to_string(),
            order_id: order_id.to_string(),
            agent_id: "agt_demo".to_string(),
            user_id: "usr_demo".to_string(),
            registry_operator_id: "gor_demo".to_string(),
            merchant_id: "toast_otto".to_string(),
            bounty_amount: dec!(2.50),
        }
    }

    #[tokio::test]
    async fn test_manager_wires_fixtures_and_services() {
        let manager = demo_manager();

        let merchant = WalletKey::new(EntityClass::Merchant, "toast_otto");
        let wallet = manager.wallet_view(&merchant).unwrap();
        assert_eq!(wallet.private.balance, dec!(500.00));

        let sealed = manager.create_receipt(receipt_request("ord_1")).await.unwrap();
        assert_eq!(sealed.public.order_id, "ord_1");
        assert_eq!(manager.metrics().receipts_created.get(), 1);
    }

    #[tokio::test]
    async fn test_stats_track_lifecycle() {
        let manager = demo_manager();
        assert_eq!(manager.stats().receipts_total, 0);

        manager.create_receipt(receipt_request("ord_1")).await.unwrap();
        manager.create_receipt(receipt_request("ord_2")).await.unwrap();

        let stats = manager.stats();
        assert_eq!(stats.receipts_total, 2);
        assert_eq!(stats.receipts_reserved, 2);
        assert_eq!(stats.bounty_reserved, dec!(5.00));
        assert_eq!(stats.settlements_total, 0);

        let split: BountySplit = [
            (EntityClass::User, dec!(1.25)),
            (EntityClass::Agent, dec!(1.00)),
            (EntityClass::RegistryOperator, dec!(0.25)),
        ]
        .into_iter()
        .collect();
        manager
            .apply_settlement(SettlementRequest {
                order_id: "ord_1".to_string(),
                status: SettlementStatus::Success,
                order_total: dec!(25.00),
                split,
            })
            .await
            .unwrap();
        manager
            .apply_settlement(SettlementRequest {
                order_id: "ord_2".to_string(),
                status: SettlementStatus::Failure,
                order_total: dec!(25.00),
                split: Default::default(),
            })
            .await
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.receipts_settled, 1);
        assert_eq!(stats.receipts_reversed, 1);
        assert_eq!(stats.receipts_reserved, 0);
        assert_eq!(stats.bounty_reserved, dec!(0));
        assert_eq!(stats.settlements_total, 2);
        assert_eq!(stats.bounty_distributed, dec!(2.50));
        assert_eq!(
            stats.distributed_by_class[&EntityClass::User],
            dec!(1.25)
        );
    }
}
