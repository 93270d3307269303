//! End-to-end attribution flows against the in-memory ledger

use attribution::{
    AppConfig, AttributionManager, BountySplit, CreateReceipt, Error, ReceiptStatus,
    SettlementRequest, SettlementStatus,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use wallet_ledger::{EntityClass, EntryReason, MemoryStore, Page, PrivacyCodec, WalletKey};

fn manager() -> AttributionManager<MemoryStore> {
    let codec = Arc::new(PrivacyCodec::new([9u8; 32]));
    AttributionManager::new(
        Arc::new(MemoryStore::new(codec.clone())),
        codec,
        &AppConfig::demo(),
    )
    .unwrap()
}

fn demo_receipt(order_id: &str, bounty: Decimal) -> CreateReceipt {
    CreateReceipt {
        offer_id: "ofr_espresso".to_string(),
        order_id: order_id.to_string(),
        agent_id: "agt_demo".to_string(),
        user_id: "usr_demo".to_string(),
        registry_operator_id: "gor_demo".to_string(),
        merchant_id: "toast_otto".to_string(),
        bounty_amount: bounty,
    }
}

fn balance(manager: &AttributionManager<MemoryStore>, class: EntityClass, id: &str) -> Decimal {
    manager
        .wallet_view(&WalletKey::new(class, id))
        .unwrap()
        .private
        .balance
}

#[tokio::test]
async fn test_full_checkout_lifecycle() {
    let manager = manager();

    // Reserve
    let receipt = manager
        .create_receipt(demo_receipt("ord_1", dec!(2.50)))
        .await
        .unwrap();
    assert_eq!(receipt.public.status, ReceiptStatus::Reserved);
    assert_eq!(
        balance(&manager, EntityClass::Merchant, "toast_otto"),
        dec!(497.50)
    );

    // Settle
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

    // Recipients got their shares on top of the demo funding
    assert_eq!(
        balance(&manager, EntityClass::User, "usr_demo"),
        dec!(501.25)
    );
    assert_eq!(
        balance(&manager, EntityClass::Agent, "agt_demo"),
        dec!(501.00)
    );
    assert_eq!(
        balance(&manager, EntityClass::RegistryOperator, "gor_demo"),
        dec!(500.25)
    );
    // Settlement never touches the merchant again
    assert_eq!(
        balance(&manager, EntityClass::Merchant, "toast_otto"),
        dec!(497.50)
    );

    // Receipt is terminal
    let receipt = manager.get_receipt("ord_1").unwrap().unwrap();
    assert_eq!(receipt.public.status, ReceiptStatus::Settled);
    let settlement = manager.get_settlement("ord_1").unwrap().unwrap();
    assert_eq!(settlement.public.status, SettlementStatus::Success);
    assert_eq!(settlement.private.order_total, dec!(25.00));
}

#[tokio::test]
async fn test_failed_order_reverses_reservation() {
    let manager = manager();
    manager
        .create_receipt(demo_receipt("ord_1", dec!(2.50)))
        .await
        .unwrap();

    manager
        .apply_settlement(SettlementRequest {
            order_id: "ord_1".to_string(),
            status: SettlementStatus::Failure,
            order_total: dec!(25.00),
            split: BountySplit::default(),
        })
        .await
        .unwrap();

    assert_eq!(
        balance(&manager, EntityClass::Merchant, "toast_otto"),
        dec!(500.00)
    );
    assert_eq!(
        manager.get_receipt("ord_1").unwrap().unwrap().public.status,
        ReceiptStatus::Reversed
    );

    // History shows the full round trip in order
    let merchant = WalletKey::new(EntityClass::Merchant, "toast_otto");
    let history = manager.history_view(&merchant, Page::default()).unwrap();
    let reasons: Vec<_> = history.iter().map(|e| e.public.reason).collect();
    assert_eq!(
        reasons,
        vec![
            EntryReason::Funding,
            EntryReason::Reservation,
            EntryReason::Reversal
        ]
    );
}

#[tokio::test]
async fn test_underfunded_merchant_rejected() {
    let mut config = AppConfig::demo();
    for fixture in &mut config.fixtures {
        if fixture.class == EntityClass::Merchant {
            fixture.amount = dec!(1.00);
        }
    }
    let codec = Arc::new(PrivacyCodec::new([9u8; 32]));
    let manager = AttributionManager::new(
        Arc::new(MemoryStore::new(codec.clone())),
        codec,
        &config,
    )
    .unwrap();

    let result = manager.create_receipt(demo_receipt("ord_1", dec!(2.50))).await;
    match result {
        Err(Error::MerchantUnderfunded {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, dec!(1.00));
            assert_eq!(requested, dec!(2.50));
        }
        other => panic!("expected MerchantUnderfunded, got {:?}", other.map(|_| ())),
    }
    assert!(manager.get_receipt("ord_1").unwrap().is_none());
}

#[tokio::test]
async fn test_settlement_is_exactly_once() {
    let manager = manager();
    manager
        .create_receipt(demo_receipt("ord_1", dec!(2.50)))
        .await
        .unwrap();

    let split: BountySplit = [(EntityClass::User, dec!(2.50))].into_iter().collect();
    manager
        .apply_settlement(SettlementRequest {
            order_id: "ord_1".to_string(),
            status: SettlementStatus::Success,
            order_total: dec!(25.00),
            split: split.clone(),
        })
        .await
        .unwrap();

    let dup = manager
        .apply_settlement(SettlementRequest {
            order_id: "ord_1".to_string(),
            status: SettlementStatus::Success,
            order_total: dec!(25.00),
            split,
        })
        .await;
    assert!(matches!(dup, Err(Error::DuplicateSettlement { .. })));
    assert_eq!(
        balance(&manager, EntityClass::User, "usr_demo"),
        dec!(502.50)
    );
}

#[tokio::test]
async fn test_commitments_verify_across_read_surface() {
    let manager = manager();
    let codec = PrivacyCodec::new([9u8; 32]);

    manager
        .create_receipt(demo_receipt("ord_1", dec!(2.50)))
        .await
        .unwrap();

    let merchant = WalletKey::new(EntityClass::Merchant, "toast_otto");
    let wallet = manager.wallet_view(&merchant).unwrap();
    assert!(codec
        .verify(&merchant.to_string(), &wallet.private, &wallet.commitment)
        .unwrap());

    for entry in manager.history_view(&merchant, Page::default()).unwrap() {
        assert!(codec
            .verify(
                &entry.public.entry_id.to_string(),
                &entry.private,
                &entry.commitment
            )
            .unwrap());
    }

    let receipt = manager.get_receipt("ord_1").unwrap().unwrap();
    assert!(codec
        .verify(
            &receipt.public.receipt_id.to_string(),
            &receipt.private,
            &receipt.commitment
        )
        .unwrap());
}

fn cents(range: std::ops::RangeInclusive<i64>) -> impl Strategy<Value = i64> {
    range
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Money is conserved through any reserve-and-settle round trip: the
    /// four demo wallets always sum to the fixture total, and the merchant
    /// ends exactly one bounty down.
    #[test]
    fn prop_settlement_conserves_money(
        bounty_cents in cents(1..=10_000),
        user_cut in 0.0f64..=1.0,
        agent_cut in 0.0f64..=1.0,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome: Result<(), TestCaseError> = runtime.block_on(async {
            let manager = manager();
            let bounty = Decimal::new(bounty_cents, 2);

            let user_cents = (bounty_cents as f64 * user_cut) as i64;
            let agent_cents = ((bounty_cents - user_cents) as f64 * agent_cut) as i64;
            let gor_cents = bounty_cents - user_cents - agent_cents;
            let split: BountySplit = [
                (EntityClass::User, Decimal::new(user_cents, 2)),
                (EntityClass::Agent, Decimal::new(agent_cents, 2)),
                (EntityClass::RegistryOperator, Decimal::new(gor_cents, 2)),
            ]
            .into_iter()
            .collect();

            manager
                .create_receipt(demo_receipt("ord_p", bounty))
                .await
                .unwrap();
            manager
                .apply_settlement(SettlementRequest {
                    order_id: "ord_p".to_string(),
                    status: SettlementStatus::Success,
                    order_total: bounty * Decimal::from(10),
                    split,
                })
                .await
                .unwrap();

            let merchant = balance(&manager, EntityClass::Merchant, "toast_otto");
            let user = balance(&manager, EntityClass::User, "usr_demo");
            let agent = balance(&manager, EntityClass::Agent, "agt_demo");
            let gor = balance(&manager, EntityClass::RegistryOperator, "gor_demo");

            prop_assert_eq!(merchant, dec!(500.00) - bounty);
            prop_assert_eq!(merchant + user + agent + gor, dec!(2000.00));
            Ok(())
        });
        outcome?;
    }

    /// A split off by at most one cent still settles, and the residual keeps
    /// the books balanced.
    #[test]
    fn prop_one_cent_residual_conserves_money(
        bounty_cents in cents(2..=10_000),
        under in proptest::bool::ANY,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome: Result<(), TestCaseError> = runtime.block_on(async {
            let manager = manager();
            let bounty = Decimal::new(bounty_cents, 2);
            let user_cents = if under { bounty_cents - 1 } else { bounty_cents + 1 };
            let split: BountySplit =
                [(EntityClass::User, Decimal::new(user_cents, 2))].into_iter().collect();

            manager
                .create_receipt(demo_receipt("ord_p", bounty))
                .await
                .unwrap();
            manager
                .apply_settlement(SettlementRequest {
                    order_id: "ord_p".to_string(),
                    status: SettlementStatus::Success,
                    order_total: bounty,
                    split,
                })
                .await
                .unwrap();

            let merchant = balance(&manager, EntityClass::Merchant, "toast_otto");
            let user = balance(&manager, EntityClass::User, "usr_demo");
            let agent = balance(&manager, EntityClass::Agent, "agt_demo");
            let gor = balance(&manager, EntityClass::RegistryOperator, "gor_demo");

            prop_assert_eq!(merchant + user + agent + gor, dec!(2000.00));
            prop_assert_eq!(user, dec!(500.00) + Decimal::new(user_cents, 2));
            Ok(())
        });
        outcome?;
    }
}
