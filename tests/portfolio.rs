//! Portfolio aggregation tests: valuation, graceful degradation, summary.

mod common;

use std::sync::Arc;

use rust_decimal_macros::dec;

use common::{FixedOracle, seed_user};
use papertrade::engine::TradeEngine;
use papertrade::error::TradeError;
use papertrade::ledger::MemoryLedger;
use papertrade::portfolio::Portfolio;
use papertrade::types::trade::TradeSide;

fn services(ledger: &MemoryLedger, oracle: &FixedOracle) -> (TradeEngine, Portfolio) {
    let ledger: Arc<MemoryLedger> = Arc::new(ledger.clone());
    let oracle: Arc<FixedOracle> = Arc::new(oracle.clone());
    (
        TradeEngine::new(ledger.clone(), oracle.clone()),
        Portfolio::new(ledger, oracle),
    )
}

#[tokio::test]
async fn positions_are_valued_at_current_prices() {
    let ledger = MemoryLedger::new();
    let oracle = FixedOracle::new();
    let (engine, portfolio) = services(&ledger, &oracle);
    let user_id = seed_user(&ledger, dec!(100000)).await;

    oracle.set("AAPL", dec!(150.00));
    engine
        .execute_trade(user_id, "AAPL", TradeSide::Buy, 10)
        .await
        .unwrap();
    oracle.set("AAPL", dec!(170.00));

    let report = portfolio.get_positions(user_id).await.unwrap();
    assert_eq!(report.positions.len(), 1);
    let view = &report.positions[0];
    assert_eq!(view.symbol, "AAPL");
    assert_eq!(view.quantity, 10);
    assert_eq!(view.average_price, dec!(150.00));
    assert_eq!(view.total_cost, dec!(1500.00));
    assert_eq!(view.current_price, Some(dec!(170.00)));
    assert_eq!(view.current_value, Some(dec!(1700.00)));
    assert_eq!(view.pnl, Some(dec!(200.00)));
    assert_eq!(view.pnl_percentage, Some(dec!(13.33)));
    assert_eq!(report.total_value, dec!(1700.00));
    assert_eq!(report.total_pnl, dec!(200.00));
}

#[tokio::test]
async fn one_failed_quote_degrades_only_that_symbol() {
    let ledger = MemoryLedger::new();
    let oracle = FixedOracle::new();
    let (engine, portfolio) = services(&ledger, &oracle);
    let user_id = seed_user(&ledger, dec!(100000)).await;

    oracle.set("AAPL", dec!(100.00));
    oracle.set("MSFT", dec!(200.00));
    engine
        .execute_trade(user_id, "AAPL", TradeSide::Buy, 10)
        .await
        .unwrap();
    engine
        .execute_trade(user_id, "MSFT", TradeSide::Buy, 5)
        .await
        .unwrap();

    // MSFT quote goes away; AAPL valuation must still come back.
    oracle.unset("MSFT");
    let report = portfolio.get_positions(user_id).await.unwrap();
    assert_eq!(report.positions.len(), 2);

    let aapl = report
        .positions
        .iter()
        .find(|p| p.symbol == "AAPL")
        .unwrap();
    assert_eq!(aapl.current_value, Some(dec!(1000.00)));

    let msft = report
        .positions
        .iter()
        .find(|p| p.symbol == "MSFT")
        .unwrap();
    assert_eq!(msft.quantity, 5);
    assert!(msft.current_price.is_none());
    assert!(msft.current_value.is_none());
    assert!(msft.pnl.is_none());

    // Totals cover only the priced symbol.
    assert_eq!(report.total_value, dec!(1000.00));
    assert_eq!(report.total_pnl, dec!(0.00));
}

#[tokio::test]
async fn summary_reports_cash_plus_invested_against_initial_balance() {
    let ledger = MemoryLedger::new();
    let oracle = FixedOracle::new();
    let (engine, portfolio) = services(&ledger, &oracle);
    let user_id = seed_user(&ledger, dec!(100000)).await;

    oracle.set("AAPL", dec!(150.00));
    engine
        .execute_trade(user_id, "AAPL", TradeSide::Buy, 10)
        .await
        .unwrap();
    oracle.set("AAPL", dec!(180.00));

    let summary = portfolio.get_summary(user_id).await.unwrap();
    assert_eq!(summary.cash_balance, dec!(98500.00));
    assert_eq!(summary.invested_value, dec!(1800.00));
    assert_eq!(summary.total_value, dec!(100300.00));
    assert_eq!(summary.total_pnl, dec!(300.00));
    assert_eq!(summary.total_pnl_percentage, dec!(0.30));
    assert_eq!(summary.positions_count, 1);
    assert_eq!(summary.total_trades, 1);
}

#[tokio::test]
async fn summary_with_no_positions_is_cash_only() {
    let ledger = MemoryLedger::new();
    let oracle = FixedOracle::new();
    let (_, portfolio) = services(&ledger, &oracle);
    let user_id = seed_user(&ledger, dec!(100000)).await;

    let summary = portfolio.get_summary(user_id).await.unwrap();
    assert_eq!(summary.total_value, dec!(100000.00));
    assert_eq!(summary.invested_value, dec!(0));
    assert_eq!(summary.total_pnl, dec!(0));
    assert_eq!(summary.positions_count, 0);
    assert_eq!(summary.total_trades, 0);
}

#[tokio::test]
async fn summary_for_unknown_user_fails() {
    let ledger = MemoryLedger::new();
    let oracle = FixedOracle::new();
    let (_, portfolio) = services(&ledger, &oracle);

    let err = portfolio
        .get_summary(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, TradeError::UserNotFound));
}
