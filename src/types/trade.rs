use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TradeSide::Buy),
            "SELL" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Pending,
    Executed,
    Cancelled,
    Failed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "PENDING",
            TradeStatus::Executed => "EXECUTED",
            TradeStatus::Cancelled => "CANCELLED",
            TradeStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(TradeStatus::Pending),
            "EXECUTED" => Some(TradeStatus::Executed),
            "CANCELLED" => Some(TradeStatus::Cancelled),
            "FAILED" => Some(TradeStatus::Failed),
            _ => None,
        }
    }
}

/// Immutable trade record, the audit trail from which balance and positions
/// are reconstructible. Inserted exactly once per executed order, never
/// updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: i64,
    pub price: Decimal,
    pub total_value: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
}
