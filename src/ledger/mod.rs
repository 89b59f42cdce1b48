//! Ledger store: durable user, position, and trade state with a per-user
//! atomic transaction boundary around trade commits.

mod memory;
mod pg;

pub use memory::MemoryLedger;
pub use pg::PgLedger;
pub use sqlx::PgPool;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{StorageError, TradeError};
use crate::types::position::Position;
use crate::types::trade::{Trade, TradeSide};
use crate::types::user::User;

/// One page of trade history, newest first, plus the total record count.
pub type TradePage = (Vec<Trade>, i64);

/// The only shared mutable resource in the system. Every read reflects
/// committed state; no balance or position is cached across calls.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StorageError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn get_position(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StorageError>;

    async fn list_positions(&self, user_id: Uuid) -> Result<Vec<Position>, StorageError>;

    async fn list_trades(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<TradePage, StorageError>;

    /// Atomically re-read the user's balance and the symbol's position under
    /// an exclusive lock, validate funds/shares, and write the new balance,
    /// the position upsert or delete, and the trade record as one unit.
    /// Rejections and storage failures leave no partial state.
    async fn commit_trade(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
        price: Decimal,
    ) -> Result<Trade, TradeError>;
}
