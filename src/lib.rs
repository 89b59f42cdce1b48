//! Paper-trading backend: trade execution, position accounting, and
//! portfolio valuation over a durable ledger.

pub mod accounting;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod portfolio;
pub mod types;
