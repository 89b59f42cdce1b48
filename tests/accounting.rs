//! Pure position-accounting tests: cost-basis math for buys and sells.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use papertrade::accounting::{CostBasis, apply_buy, apply_sell, plan_trade};
use papertrade::error::TradeError;
use papertrade::types::trade::TradeSide;

const TOLERANCE: Decimal = dec!(0.000001);

#[test]
fn buy_creates_basis_at_trade_price() {
    let basis = apply_buy(None, 10, dec!(150.00));
    assert_eq!(basis.quantity, 10);
    assert_eq!(basis.average_price, dec!(150.00));
    assert_eq!(basis.total_cost, dec!(1500.00));
}

#[test]
fn buy_accumulates_weighted_average() {
    let basis = apply_buy(None, 10, dec!(150.00));
    let basis = apply_buy(Some(basis), 5, dec!(160.00));

    assert_eq!(basis.quantity, 15);
    assert_eq!(basis.total_cost, dec!(2300.00));
    // (1500 + 800) / 15 = 153.33...
    let expected = dec!(2300) / dec!(15);
    assert!((basis.average_price - expected).abs() < TOLERANCE);
    assert!((basis.average_price - dec!(153.333333)).abs() < TOLERANCE);
}

#[test]
fn total_cost_accumulates_by_addition_across_many_buys() {
    let mut basis = apply_buy(None, 3, dec!(33.33));
    for _ in 0..100 {
        basis = apply_buy(Some(basis), 3, dec!(33.33));
    }
    // 101 buys of 3 @ 33.33: the sum is exact because cost is never
    // recomputed as quantity * average.
    assert_eq!(basis.quantity, 303);
    assert_eq!(basis.total_cost, dec!(33.33) * dec!(303));
}

#[test]
fn partial_sell_reduces_cost_proportionally_and_keeps_average() {
    let basis = apply_buy(None, 15, dec!(100.00));
    let outcome = apply_sell(basis, 5, dec!(120.00)).unwrap();

    let remaining = outcome.remaining.unwrap();
    assert_eq!(remaining.quantity, 10);
    assert_eq!(remaining.average_price, dec!(100.00));
    assert!((remaining.total_cost - dec!(1000.00)).abs() < TOLERANCE);
    assert_eq!(outcome.proceeds, dec!(600.00));
    assert_eq!(outcome.realized_pnl, dec!(100.00));
}

#[test]
fn full_sell_liquidates_position() {
    let basis = apply_buy(None, 10, dec!(150.00));
    let outcome = apply_sell(basis, 10, dec!(170.00)).unwrap();

    assert!(outcome.remaining.is_none());
    assert_eq!(outcome.proceeds, dec!(1700.00));
    assert_eq!(outcome.realized_pnl, dec!(200.00));
}

#[test]
fn sell_more_than_held_fails() {
    let basis = apply_buy(None, 10, dec!(150.00));
    let err = apply_sell(basis, 11, dec!(170.00)).unwrap_err();
    assert!(matches!(
        err,
        TradeError::InsufficientShares {
            held: 10,
            requested: 11
        }
    ));
}

#[test]
fn sell_proceeds_are_full_notional_regardless_of_cost_basis() {
    // Selling at a loss still credits quantity * price.
    let basis = apply_buy(None, 10, dec!(200.00));
    let outcome = apply_sell(basis, 10, dec!(50.00)).unwrap();
    assert_eq!(outcome.proceeds, dec!(500.00));
    assert_eq!(outcome.realized_pnl, dec!(-1500.00));
}

#[test]
fn plan_buy_debits_balance_and_builds_position() {
    let plan = plan_trade(dec!(100000), None, "AAPL", TradeSide::Buy, 10, dec!(150.00)).unwrap();
    assert_eq!(plan.total_value, dec!(1500.00));
    assert_eq!(plan.balance_after, dec!(98500.00));
    assert_eq!(
        plan.position_after,
        Some(CostBasis {
            quantity: 10,
            average_price: dec!(150.00),
            total_cost: dec!(1500.00),
        })
    );
}

#[test]
fn plan_buy_rejects_insufficient_funds() {
    let err = plan_trade(dec!(1000), None, "AAPL", TradeSide::Buy, 10, dec!(150.00)).unwrap_err();
    assert!(matches!(err, TradeError::InsufficientFunds { .. }));
}

#[test]
fn plan_sell_credits_balance_and_deletes_on_full_liquidation() {
    let basis = CostBasis {
        quantity: 15,
        average_price: dec!(2300) / dec!(15),
        total_cost: dec!(2300.00),
    };
    let plan = plan_trade(
        dec!(97700),
        Some(basis),
        "AAPL",
        TradeSide::Sell,
        15,
        dec!(170.00),
    )
    .unwrap();
    assert_eq!(plan.balance_after, dec!(100250.00));
    assert!(plan.position_after.is_none());
}

#[test]
fn plan_sell_without_position_fails() {
    let err = plan_trade(dec!(1000), None, "AAPL", TradeSide::Sell, 1, dec!(150.00)).unwrap_err();
    assert!(matches!(err, TradeError::NoPosition(ref s) if s == "AAPL"));
}
