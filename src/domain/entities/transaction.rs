use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
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
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => Err(ValidationError::InvalidIdentifier(format!(
                "unknown trade side '{}'",
                other
            ))),
        }
    }
}

/// Immutable record of one executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub order_id: Option<Uuid>,
    pub side: TradeSide,
    pub share_quantity: Quantity,
    pub price_per_share: Price,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn record(
        account_id: Uuid,
        stock_id: Uuid,
        order_id: Option<Uuid>,
        side: TradeSide,
        share_quantity: Quantity,
        price_per_share: Price,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            account_id,
            stock_id,
            order_id,
            side,
            share_quantity,
            price_per_share,
            created_at: Utc::now(),
        }
    }

    pub fn notional(&self) -> Result<Decimal, ValidationError> {
        self.price_per_share.times(self.share_quantity)
    }
}
