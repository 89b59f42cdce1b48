//! Portfolio aggregation: read-only valuation of holdings against the price
//! oracle. Never touches balance or position state; a failed quote degrades
//! that one symbol instead of failing the whole response.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::error::TradeError;
use crate::ledger::LedgerStore;
use crate::oracle::PriceOracle;
use crate::types::position::Position;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// One holding valued at the current price. Valuation fields are `None` when
/// the oracle could not price the symbol.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub symbol: String,
    pub quantity: i64,
    pub average_price: Decimal,
    pub total_cost: Decimal,
    pub current_price: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub pnl: Option<Decimal>,
    pub pnl_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionsReport {
    pub positions: Vec<PositionView>,
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub cash_balance: Decimal,
    pub invested_value: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_percentage: Decimal,
    pub positions_count: usize,
    pub total_trades: i64,
}

#[derive(Clone)]
pub struct Portfolio {
    ledger: Arc<dyn LedgerStore>,
    oracle: Arc<dyn PriceOracle>,
}

impl Portfolio {
    pub fn new(ledger: Arc<dyn LedgerStore>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self { ledger, oracle }
    }

    async fn value_position(&self, position: &Position) -> PositionView {
        let priced = match self.oracle.get_price(&position.symbol).await {
            Ok(quote) => Some(quote.price),
            Err(err) => {
                tracing::warn!(symbol = %position.symbol, error = %err, "valuation unavailable");
                None
            }
        };
        match priced {
            Some(price) => {
                let current_value = Decimal::from(position.quantity) * price;
                let pnl = current_value - position.total_cost;
                let pnl_percentage = if position.total_cost > Decimal::ZERO {
                    pnl / position.total_cost * HUNDRED
                } else {
                    Decimal::ZERO
                };
                PositionView {
                    symbol: position.symbol.clone(),
                    quantity: position.quantity,
                    average_price: position.average_price.round_dp(2),
                    total_cost: position.total_cost.round_dp(2),
                    current_price: Some(price.round_dp(2)),
                    current_value: Some(current_value.round_dp(2)),
                    pnl: Some(pnl.round_dp(2)),
                    pnl_percentage: Some(pnl_percentage.round_dp(2)),
                }
            }
            None => PositionView {
                symbol: position.symbol.clone(),
                quantity: position.quantity,
                average_price: position.average_price.round_dp(2),
                total_cost: position.total_cost.round_dp(2),
                current_price: None,
                current_value: None,
                pnl: None,
                pnl_percentage: None,
            },
        }
    }

    /// All holdings with current prices and P&L. Totals cover only the
    /// symbols the oracle could price.
    pub async fn get_positions(&self, user_id: Uuid) -> Result<PositionsReport, TradeError> {
        let positions = self.ledger.list_positions(user_id).await?;

        let mut views = Vec::with_capacity(positions.len());
        let mut total_value = Decimal::ZERO;
        let mut priced_cost = Decimal::ZERO;
        for position in &positions {
            let view = self.value_position(position).await;
            if let Some(value) = view.current_value {
                total_value += value;
                priced_cost += position.total_cost;
            }
            views.push(view);
        }

        let total_pnl = total_value - priced_cost;
        let total_pnl_percentage = if priced_cost > Decimal::ZERO {
            total_pnl / priced_cost * HUNDRED
        } else {
            Decimal::ZERO
        };
        Ok(PositionsReport {
            positions: views,
            total_value: total_value.round_dp(2),
            total_pnl: total_pnl.round_dp(2),
            total_pnl_percentage: total_pnl_percentage.round_dp(2),
        })
    }

    /// Cash plus invested value, and the total P&L against the user's
    /// initial balance.
    pub async fn get_summary(&self, user_id: Uuid) -> Result<PortfolioSummary, TradeError> {
        let user = self
            .ledger
            .get_user(user_id)
            .await?
            .ok_or(TradeError::UserNotFound)?;
        let positions = self.ledger.list_positions(user_id).await?;

        let mut invested_value = Decimal::ZERO;
        for position in &positions {
            if let Some(value) = self.value_position(position).await.current_value {
                invested_value += value;
            }
        }

        let (_, total_trades) = self.ledger.list_trades(user_id, 1, 0).await?;

        let total_value = user.cash_balance + invested_value;
        let total_pnl = total_value - user.initial_balance;
        let total_pnl_percentage = if user.initial_balance > Decimal::ZERO {
            total_pnl / user.initial_balance * HUNDRED
        } else {
            Decimal::ZERO
        };
        Ok(PortfolioSummary {
            total_value: total_value.round_dp(2),
            cash_balance: user.cash_balance.round_dp(2),
            invested_value: invested_value.round_dp(2),
            total_pnl: total_pnl.round_dp(2),
            total_pnl_percentage: total_pnl_percentage.round_dp(2),
            positions_count: positions.len(),
            total_trades,
        })
    }
}
