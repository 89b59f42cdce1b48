//! Shared fixtures: mock oracles and user/ledger helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use papertrade::error::OracleError;
use papertrade::ledger::{LedgerStore, MemoryLedger};
use papertrade::oracle::{PriceOracle, Quote};
use papertrade::types::user::User;

/// Oracle returning a fixed price per symbol. Unknown symbols fail as
/// unavailable; a price set to zero is rejected like a closed market.
#[derive(Clone, Default)]
pub struct FixedOracle {
    prices: Arc<RwLock<HashMap<String, Decimal>>>,
}

impl FixedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, symbol: &str, price: Decimal) {
        self.prices
            .write()
            .unwrap()
            .insert(symbol.to_uppercase(), price);
    }

    pub fn unset(&self, symbol: &str) {
        self.prices.write().unwrap().remove(&symbol.to_uppercase());
    }
}

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn get_price(&self, symbol: &str) -> Result<Quote, OracleError> {
        let symbol = symbol.to_uppercase();
        let price = self.prices.read().unwrap().get(&symbol).copied();
        match price {
            Some(price) if price > Decimal::ZERO => Ok(Quote {
                symbol,
                price,
                timestamp: Utc::now(),
            }),
            Some(price) => Err(OracleError::NonPositivePrice { symbol, price }),
            None => Err(OracleError::Unavailable {
                symbol,
                reason: "no quote".into(),
            }),
        }
    }
}

/// Oracle that always fails, for outage scenarios.
#[derive(Clone, Default)]
pub struct DownOracle;

#[async_trait]
impl PriceOracle for DownOracle {
    async fn get_price(&self, symbol: &str) -> Result<Quote, OracleError> {
        Err(OracleError::Unavailable {
            symbol: symbol.to_uppercase(),
            reason: "oracle down".into(),
        })
    }
}

/// Insert a user with the given starting balance and return its id.
pub async fn seed_user(ledger: &MemoryLedger, balance: Decimal) -> Uuid {
    let user = User {
        id: Uuid::new_v4(),
        username: format!("user-{}", Uuid::new_v4()),
        password_hash: "unused".into(),
        cash_balance: balance,
        initial_balance: balance,
        created_at: Utc::now(),
    };
    ledger.insert_user(&user).await.unwrap();
    user.id
}
