//! Attribution service configuration
//!
//! Covers the split-sum tolerance and the demo wallet fixtures used to fund
//! an empty ledger. Amounts are decimal strings in the TOML form.

use crate::error::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wallet_ledger::{EntityClass, EntryReason, LedgerEntry, WalletKey, WalletStore};

/// Correlation id stamped on fixture funding entries
pub const FIXTURE_CORRELATION: &str = "fixture";

/// One pre-funded wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureWallet {
    /// Entity class of the wallet
    pub class: EntityClass,
    /// Entity id
    pub id: String,
    /// Opening balance
    pub amount: Decimal,
}

/// Attribution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tolerance for the split-sum check; one minor currency unit
    #[serde(default = "default_epsilon")]
    pub epsilon: Decimal,

    /// Wallets funded at startup when the ledger is empty
    #[serde(default)]
    pub fixtures: Vec<FixtureWallet>,
}

fn default_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            fixtures: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(wallet_ledger::Error::from)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| wallet_ledger::Error::Config(format!("bad config: {}", e)))?;
        Ok(config)
    }

    /// Demo configuration matching the sandbox environment
    pub fn demo() -> Self {
        let amount = Decimal::new(50000, 2);
        Self {
            epsilon: default_epsilon(),
            fixtures: vec![
                FixtureWallet {
                    class: EntityClass::Merchant,
                    id: "toast_otto".to_string(),
                    amount,
                },
                FixtureWallet {
                    class: EntityClass::User,
                    id: "usr_demo".to_string(),
                    amount,
                },
                FixtureWallet {
                    class: EntityClass::Agent,
                    id: "agt_demo".to_string(),
                    amount,
                },
                FixtureWallet {
                    class: EntityClass::RegistryOperator,
                    id: "gor_demo".to_string(),
                    amount,
                },
            ],
        }
    }

    /// Fund the fixture wallets through ordinary ledger entries
    ///
    /// Skips wallets that already have history so a restart does not double
    /// fund them.
    pub fn seed_fixtures<S: WalletStore>(&self, store: &S) -> Result<()> {
        let mut entries = Vec::new();
        for fixture in &self.fixtures {
            let key = WalletKey::new(fixture.class, fixture.id.clone());
            if store.get_wallet(&key)?.transaction_count > 0 {
                tracing::debug!(wallet = %key, "fixture wallet already funded");
                continue;
            }
            entries.push(LedgerEntry::new(
                key,
                fixture.amount,
                EntryReason::Funding,
                FIXTURE_CORRELATION,
            ));
        }
        if entries.is_empty() {
            return Ok(());
        }
        let count = entries.len();
        store.apply(entries)?;
        tracing::info!(wallets = count, "fixture wallets funded");
        Ok(())
    }
}
