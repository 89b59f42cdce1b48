use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Holding per (user, symbol), unique per pair. `total_cost` is maintained by
/// accumulation, never recomputed as `quantity * average_price`. A position
/// with zero quantity is never stored; the row is deleted instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    pub average_price: Decimal,
    pub total_cost: Decimal,
    pub updated_at: DateTime<Utc>,
}
