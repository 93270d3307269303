// Walks one attributed checkout end to end against the in-memory ledger:
// fund the demo wallets, reserve a bounty, settle it, and print the sealed
// records a caller would see.

use anyhow::Result;
use attribution::{
    AppConfig, AttributionManager, BountySplit, CreateReceipt, SettlementRequest, SettlementStatus,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wallet_ledger::{EntityClass, MemoryStore, Page, PrivacyCodec, WalletKey};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let codec = Arc::new(PrivacyCodec::ephemeral());
    let manager = AttributionManager::new(
        Arc::new(MemoryStore::new(codec.clone())),
        codec,
        &AppConfig::demo(),
    )?;

    let receipt = manager
        .create_receipt(CreateReceipt {
            offer_id: "ofr_espresso".to_string(),
            order_id: "ord_demo_001".to_string(),
            agent_id: "agt_demo".to_string(),
            user_id: "usr_demo".to_string(),
            registry_operator_id: "gor_demo".to_string(),
            merchant_id: "toast_otto".to_string(),
            bounty_amount: dec!(2.50),
        })
        .await?;
    println!("receipt: {}", serde_json::to_string_pretty(&receipt)?);

    let split: BountySplit = [
        (EntityClass::User, dec!(1.25)),
        (EntityClass::Agent, dec!(1.00)),
        (EntityClass::RegistryOperator, dec!(0.25)),
    ]
    .into_iter()
    .collect();
    let settlement = manager
        .apply_settlement(SettlementRequest {
            order_id: "ord_demo_001".to_string(),
            status: SettlementStatus::Success,
            order_total: dec!(25.00),
            split,
        })
        .await?;
    println!("settlement: {}", serde_json::to_string_pretty(&settlement)?);

    for (class, id) in [
        (EntityClass::Merchant, "toast_otto"),
        (EntityClass::User, "usr_demo"),
        (EntityClass::Agent, "agt_demo"),
        (EntityClass::RegistryOperator, "gor_demo"),
    ] {
        let key = WalletKey::new(class, id);
        let wallet = manager.wallet_view(&key)?;
        println!(
            "{}: balance {} ({} entries)",
            key,
            wallet.private.balance,
            manager.history_view(&key, Page::default())?.len()
        );
    }

    println!(
        "stats: {}",
        serde_json::to_string_pretty(&manager.stats())?
    );

    Ok(())
}
