//! In-memory ledger for running without Postgres and for integration tests.
//! One mutex guards the whole store: coarser than the row locks the Postgres
//! ledger takes, but it gives the same per-user serializability.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::accounting::{self, CostBasis};
use crate::error::{StorageError, TradeError};
use crate::types::position::Position;
use crate::types::trade::{Trade, TradeSide, TradeStatus};
use crate::types::user::User;

use super::{LedgerStore, TradePage};

#[derive(Default)]
struct MemState {
    users: HashMap<Uuid, User>,
    positions: HashMap<(Uuid, String), Position>,
    // Append-only, insertion order == chronological order.
    trades: Vec<Trade>,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<MemState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut state = self.inner.lock().await;
        if state.users.contains_key(&user.id)
            || state.users.values().any(|u| u.username == user.username)
        {
            return Err(StorageError {
                reason: format!("user '{}' already exists", user.username),
            });
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StorageError> {
        let state = self.inner.lock().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, StorageError> {
        let state = self.inner.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_position(
        &self,
        user_id: Uuid,
        symbol: &str,
    ) -> Result<Option<Position>, StorageError> {
        let state = self.inner.lock().await;
        Ok(state.positions.get(&(user_id, symbol.to_string())).cloned())
    }

    async fn list_positions(&self, user_id: Uuid) -> Result<Vec<Position>, StorageError> {
        let state = self.inner.lock().await;
        let mut positions: Vec<Position> = state
            .positions
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn list_trades(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<TradePage, StorageError> {
        let state = self.inner.lock().await;
        let mine: Vec<&Trade> = state
            .trades
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .collect();
        let total = mine.len() as i64;
        let page = mine
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn commit_trade(
        &self,
        user_id: Uuid,
        symbol: &str,
        side: TradeSide,
        quantity: i64,
        price: Decimal,
    ) -> Result<Trade, TradeError> {
        let mut state = self.inner.lock().await;

        let balance_before = state
            .users
            .get(&user_id)
            .ok_or(TradeError::UserNotFound)?
            .cash_balance;

        let key = (user_id, symbol.to_string());
        let basis = state.positions.get(&key).map(|p| CostBasis {
            quantity: p.quantity,
            average_price: p.average_price,
            total_cost: p.total_cost,
        });

        let plan = accounting::plan_trade(balance_before, basis, symbol, side, quantity, price)?;

        // Nothing past validation can fail, so balance, position, and trade
        // record always change together.

        let now = Utc::now();
        match plan.position_after {
            Some(basis) => {
                state.positions.insert(
                    key,
                    Position {
                        user_id,
                        symbol: symbol.to_string(),
                        quantity: basis.quantity,
                        average_price: basis.average_price,
                        total_cost: basis.total_cost,
                        updated_at: now,
                    },
                );
            }
            None => {
                state.positions.remove(&key);
            }
        }

        if let Some(user) = state.users.get_mut(&user_id) {
            user.cash_balance = plan.balance_after;
        }

        let trade = Trade {
            id: Uuid::new_v4(),
            user_id,
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            total_value: plan.total_value,
            balance_before,
            balance_after: plan.balance_after,
            status: TradeStatus::Executed,
            created_at: now,
        };
        state.trades.push(trade.clone());
        Ok(trade)
    }
}
