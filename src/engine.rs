//! Trade execution engine: validates an order, prices it against the oracle,
//! and commits the balance/position/trade mutation through the ledger as one
//! atomic unit.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::TradeError;
use crate::ledger::LedgerStore;
use crate::oracle::PriceOracle;
use crate::types::trade::{Trade, TradeSide};

const MAX_SYMBOL_LEN: usize = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Executed trade plus a human-readable confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct TradeExecution {
    #[serde(flatten)]
    pub trade: Trade,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeHistory {
    pub trades: Vec<Trade>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Clone)]
pub struct TradeEngine {
    ledger: Arc<dyn LedgerStore>,
    oracle: Arc<dyn PriceOracle>,
}

impl TradeEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self { ledger, oracle }
    }

    /// Execute one market-price order. Validation failures return before any
    /// mutation; the commit itself is all-or-nothing inside the ledger.
    pub async fn execute_trade(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
    ) -> Result<TradeExecution, TradeError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(TradeError::InvalidOrder("symbol must not be empty".into()));
        }
        if symbol.chars().count() > MAX_SYMBOL_LEN {
            return Err(TradeError::InvalidOrder(format!(
                "symbol must be at most {MAX_SYMBOL_LEN} characters"
            )));
        }
        if quantity <= 0 {
            return Err(TradeError::InvalidOrder(
                "quantity must be positive".into(),
            ));
        }

        self.ledger
            .get_user(user_id)
            .await?
            .ok_or(TradeError::UserNotFound)?;

        // Priced before the ledger lock is taken; a slow or down oracle must
        // never stall trades holding a balance lock.
        let quote = self.oracle.get_price(&symbol).await?;

        let trade = self
            .ledger
            .commit_trade(user_id, &symbol, side, quantity, quote.price)
            .await?;

        let verb = match side {
            TradeSide::Buy => "bought",
            TradeSide::Sell => "sold",
        };
        let message = format!("Successfully {verb} {quantity} shares of {symbol}");
        tracing::info!(
            user_id = %user_id,
            %symbol,
            side = side.as_str(),
            quantity,
            price = %trade.price,
            balance_after = %trade.balance_after,
            "trade executed"
        );
        Ok(TradeExecution { trade, message })
    }

    /// Paginated trade history, newest first. `page` starts at 1,
    /// `page_size` is capped at 100.
    pub async fn get_trade_history(
        &self,
        user_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<TradeHistory, TradeError> {
        if page < 1 {
            return Err(TradeError::InvalidOrder("page must be >= 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(TradeError::InvalidOrder(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| TradeError::InvalidOrder("page is out of range".into()))?;
        let (trades, total_count) = self.ledger.list_trades(user_id, page_size, offset).await?;
        Ok(TradeHistory {
            trades,
            total_count,
            page,
            page_size,
        })
    }
}
