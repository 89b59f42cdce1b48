//! Error taxonomy for trade execution and its collaborators.

use rust_decimal::Decimal;

/// The ledger store could not complete a read or commit. Retry-safe: the
/// all-or-nothing transaction guarantees no partial write occurred.
#[derive(Debug, thiserror::Error)]
#[error("storage failure: {reason}")]
pub struct StorageError {
    pub reason: String,
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self {
            reason: err.to_string(),
        }
    }
}

/// Failures of the external price oracle. Always surfaced before any ledger
/// lock is taken.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("price lookup failed for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("oracle returned non-positive price {price} for {symbol}")]
    NonPositivePrice { symbol: String, price: Decimal },
}

/// Everything that can go wrong executing one order. Validation variants are
/// detected before any mutation and leave no side effects.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("user not found")]
    UserNotFound,

    #[error("price unavailable: {0}")]
    PriceUnavailable(#[from] OracleError),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("no position in {0} to sell")]
    NoPosition(String),

    #[error("insufficient shares: have {held}, trying to sell {requested}")]
    InsufficientShares { held: i64, requested: i64 },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
