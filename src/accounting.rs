//! Position accounting: pure cost-basis math for buys and sells.
//! No I/O; deterministic given inputs. Testable without a database.

use rust_decimal::Decimal;

use crate::error::TradeError;
use crate::types::trade::TradeSide;

/// Cost-basis state of one (user, symbol) holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBasis {
    pub quantity: i64,
    pub average_price: Decimal,
    pub total_cost: Decimal,
}

/// Result of selling from a holding: the remaining basis (`None` when fully
/// liquidated), the notional proceeds, and the realized P&L of the sold lot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellOutcome {
    pub remaining: Option<CostBasis>,
    pub proceeds: Decimal,
    pub realized_pnl: Decimal,
}

/// Apply a buy of `quantity` shares at `price` to an optional prior holding.
///
/// `total_cost` is accumulated by addition; the recomputed average is never
/// multiplied back out, so rounding cannot drift across many partial buys.
pub fn apply_buy(prior: Option<CostBasis>, quantity: i64, price: Decimal) -> CostBasis {
    debug_assert!(quantity > 0 && price > Decimal::ZERO);
    let cost = Decimal::from(quantity) * price;
    match prior {
        None => CostBasis {
            quantity,
            average_price: price,
            total_cost: cost,
        },
        Some(prior) => {
            let new_quantity = prior.quantity + quantity;
            let new_total_cost = prior.total_cost + cost;
            CostBasis {
                quantity: new_quantity,
                average_price: new_total_cost / Decimal::from(new_quantity),
                total_cost: new_total_cost,
            }
        }
    }
}

/// Apply a sell of `quantity` shares at `price` to an existing holding.
///
/// The cost basis of the remainder is reduced proportionally and its average
/// price is unchanged. Proceeds are the full notional `quantity * price`.
pub fn apply_sell(
    prior: CostBasis,
    quantity: i64,
    price: Decimal,
) -> Result<SellOutcome, TradeError> {
    if quantity <= 0 || quantity > prior.quantity {
        return Err(TradeError::InsufficientShares {
            held: prior.quantity,
            requested: quantity,
        });
    }
    let proceeds = Decimal::from(quantity) * price;
    let realized_pnl = Decimal::from(quantity) * (price - prior.average_price);
    let remaining_quantity = prior.quantity - quantity;
    let remaining = if remaining_quantity == 0 {
        None
    } else {
        let new_total_cost =
            prior.total_cost * Decimal::from(remaining_quantity) / Decimal::from(prior.quantity);
        Some(CostBasis {
            quantity: remaining_quantity,
            average_price: prior.average_price,
            total_cost: new_total_cost,
        })
    };
    Ok(SellOutcome {
        remaining,
        proceeds,
        realized_pnl,
    })
}

/// Fully validated mutation for one trade, computed against balance and
/// position state re-read under the ledger's lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradePlan {
    pub total_value: Decimal,
    pub balance_after: Decimal,
    /// `None` means the position row is deleted (full liquidation).
    pub position_after: Option<CostBasis>,
}

/// Validate a trade against locked state and compute the resulting balance
/// and position. Rejections here leave the ledger untouched.
pub fn plan_trade(
    balance: Decimal,
    position: Option<CostBasis>,
    symbol: &str,
    side: TradeSide,
    quantity: i64,
    price: Decimal,
) -> Result<TradePlan, TradeError> {
    let total_value = Decimal::from(quantity) * price;
    match side {
        TradeSide::Buy => {
            if balance < total_value {
                return Err(TradeError::InsufficientFunds {
                    needed: total_value,
                    available: balance,
                });
            }
            Ok(TradePlan {
                total_value,
                balance_after: balance - total_value,
                position_after: Some(apply_buy(position, quantity, price)),
            })
        }
        TradeSide::Sell => {
            let prior = position.ok_or_else(|| TradeError::NoPosition(symbol.to_string()))?;
            let outcome = apply_sell(prior, quantity, price)?;
            Ok(TradePlan {
                total_value,
                balance_after: balance + outcome.proceeds,
                position_after: outcome.remaining,
            })
        }
    }
}
