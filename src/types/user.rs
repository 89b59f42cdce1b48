use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// User account. `cash_balance` is mutated only through trade execution;
/// `initial_balance` is fixed at registration.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub cash_balance: Decimal,
    pub initial_balance: Decimal,
    pub created_at: DateTime<Utc>,
}
