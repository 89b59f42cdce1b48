//! Price oracle: external quote source, treated as untrusted input.
//! Called before any ledger lock is taken so a slow quote cannot stall
//! unrelated trades.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::OracleError;

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current price for a symbol. Implementations must reject zero or
    /// negative prices (market closed, unknown symbol, garbage feed).
    async fn get_price(&self, symbol: &str) -> Result<Quote, OracleError>;
}

const QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";
const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Finnhub quote client. The free-tier quote endpoint returns the current
/// price in field `c`, with `0` when the symbol is unknown.
#[derive(Clone)]
pub struct FinnhubOracle {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct FinnhubQuote {
    #[serde(rename = "c")]
    current: f64,
}

impl FinnhubOracle {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl PriceOracle for FinnhubOracle {
    async fn get_price(&self, symbol: &str) -> Result<Quote, OracleError> {
        let symbol = symbol.to_uppercase();
        let unavailable = |reason: String| OracleError::Unavailable {
            symbol: symbol.clone(),
            reason,
        };

        let response = self
            .client
            .get(QUOTE_URL)
            .query(&[("symbol", symbol.as_str()), ("token", self.api_key.as_str())])
            .timeout(QUOTE_TIMEOUT)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "quote API returned {}",
                response.status()
            )));
        }

        let quote: FinnhubQuote = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let price =
            Decimal::try_from(quote.current).map_err(|e| unavailable(e.to_string()))?;
        if price <= Decimal::ZERO {
            return Err(OracleError::NonPositivePrice { symbol, price });
        }

        Ok(Quote {
            symbol,
            price,
            timestamp: Utc::now(),
        })
    }
}
