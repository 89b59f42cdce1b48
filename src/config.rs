//! Environment configuration. All values have development defaults except
//! `DATABASE_URL`, whose absence selects the in-memory ledger.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub finnhub_api_key: String,
    pub initial_balance: Decimal,
}

impl Config {
    pub fn from_env() -> Self {
        let initial_balance = std::env::var("INITIAL_BALANCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(dec!(100000));
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-secret-change-in-production".into()),
            finnhub_api_key: std::env::var("FINNHUB_API_KEY").unwrap_or_default(),
            initial_balance,
        }
    }
}
