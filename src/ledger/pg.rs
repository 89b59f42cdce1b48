//! Postgres ledger. `commit_trade` takes row-level locks on the user row and
//! the traded symbol's position row, so two trades for the same user
//! serialize while trades for different users or symbols run in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::accounting::{self, CostBasis};
use crate::error::{StorageError, TradeError};
use crate::types::position::Position;
use crate::types::trade::{Trade, TradeSide, TradeStatus};
use crate::types::user::User;

use super::{LedgerStore, TradePage};

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect from `DATABASE_URL` and run embedded migrations.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TradeRow {
    id: Uuid,
    user_id: Uuid,
    symbol: String,
    side: String,
    quantity: i64,
    price: Decimal,
    total_value: Decimal,
    balance_before: Decimal,
    balance_after: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

fn trade_row_to_trade(row: TradeRow) -> Result<Trade, StorageError> {
    let side = TradeSide::parse(&row.side).ok_or_else(|| StorageError {
        reason: format!("unknown trade side '{}' in row {}", row.side, row.id),
    })?;
    let status = TradeStatus::parse(&row.status).ok_or_else(|| StorageError {
        reason: format!("unknown trade status '{}' in row {}", row.status, row.id),
    })?;
    Ok(Trade {
        id: row.id,
        user_id: row.user_id,
        symbol: row.symbol,
        side,
        quantity: row.quantity,
        price: row.price,
        total_value: row.total_value,
        balance_before: row.balance_before,
        balance_after: row.balance_after,
        status,
        created_at: row.created_at,
    })
}

fn position_basis(position: &Position) -> CostBasis {
    CostBasis {
        quantity: position.quantity,
        average_price: position.average_price,
        total_cost: position.total_cost,
    }
}

async fn upsert_position(
    conn: &mut PgConnection,
    user_id: Uuid,
    symbol: &str,
    basis: &CostBasis,
    updated_at: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO positions (user_id, symbol, quantity, average_price, total_cost, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (user_id, symbol) DO UPDATE \
         SET quantity = $3, average_price = $4, total_cost = $5, updated_at = $6",
    )
    .bind(user_id)
    .bind(symbol)
    .bind(basis.quantity)
    .bind(basis.average_price)
    .bind(basis.total_cost)
    .bind(updated_at)
    .execute(conn)
    .await
    .map_err(StorageError::from)?;
    Ok(())
}

async fn delete_position(
    conn: &mut PgConnection,
    user_id: Uuid,
    symbol: &str,
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM positions WHERE user_id = $1 AND symbol = $2")
        .bind(user_id)
        .bind(symbol)
        .execute(conn)
        .await
        .map_err(StorageError::from)?;
    Ok(())
}

async fn insert_trade(conn: &mut PgConnection, trade: &Trade) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO trades (id, user_id, symbol, side, quantity, price, total_value, \
         balance_before, balance_after, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(trade.id)
    .bind(trade.user_id)
    .bind(&trade.symbol)
    .bind(trade.side.as_str())
    .bind(trade.quantity)
    .bind(trade.price)
    .bind(trade.total_value)
    .bind(trade.balance_before)
    .bind(trade.balance_after)
    .bind(trade.status.as_str())
    .bind(trade.created_at)
    .execute(conn)
    .await
    .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, cash_balance, initial_balance, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.cash_balance)
        .bind(user.initial_balance)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, cash_balance, initial_balance, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(row)
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, StorageError> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, cash_balance, initial_balance, created_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(row)
    }

    async fn get_position(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StorageError> {
        let row = sqlx::query_as::<_, Position>(
            "SELECT user_id, symbol, quantity, average_price, total_cost, updated_at \
             FROM positions WHERE user_id = $1 AND symbol = $2",
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(row)
    }

    async fn list_positions(&self, user_id: Uuid) -> Result<Vec<Position>, StorageError> {
        let rows = sqlx::query_as::<_, Position>(
            "SELECT user_id, symbol, quantity, average_price, total_cost, updated_at \
             FROM positions WHERE user_id = $1 ORDER BY symbol",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows)
    }

    async fn list_trades(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<TradePage, StorageError> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT id, user_id, symbol, side, quantity, price, total_value, \
             balance_before, balance_after, status, created_at \
             FROM trades WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trades WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let trades = rows
            .into_iter()
            .map(trade_row_to_trade)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((trades, total))
    }

    async fn commit_trade(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
        price: Decimal,
    ) -> Result<Trade, TradeError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        // Exclusive lock on the balance row for the duration of the commit.
        let user: Option<User> = sqlx::query_as(
            "SELECT id, username, password_hash, cash_balance, initial_balance, created_at \
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StorageError::from)?;
        let user = user.ok_or(TradeError::UserNotFound)?;

        // Lock the position row for this symbol; rows for other symbols stay free.
        let position: Option<Position> = sqlx::query_as(
            "SELECT user_id, symbol, quantity, average_price, total_cost, updated_at \
             FROM positions WHERE user_id = $1 AND symbol = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        // Validation against the locked state; an error here drops the
        // transaction and rolls back with nothing written.
        let plan = accounting::plan_trade(
            user.cash_balance,
            position.as_ref().map(position_basis),
            symbol,
            side,
            quantity,
            price,
        )?;

        let now = Utc::now();
        match &plan.position_after {
            Some(basis) => upsert_position(&mut *tx, user_id, symbol, basis, now).await?,
            None => delete_position(&mut *tx, user_id, symbol).await?,
        }

        sqlx::query("UPDATE users SET cash_balance = $1 WHERE id = $2")
            .bind(plan.balance_after)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        let trade = Trade {
            id: Uuid::new_v4(),
            user_id,
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            total_value: plan.total_value,
            balance_before: user.cash_balance,
            balance_after: plan.balance_after,
            status: TradeStatus::Executed,
            created_at: now,
        };
        insert_trade(&mut *tx, &trade).await?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(trade)
    }
}
