use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::entities::transaction::TradeSide;
use crate::domain::errors::ValidationError;
use crate::domain::value_objects::{price::Price, quantity::Quantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    BuyLimit,
    SellLimit,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::BuyLimit => "BUY_LIMIT",
            OrderSide::SellLimit => "SELL_LIMIT",
        }
    }

    /// Ledger direction of the trade this order produces
    pub fn trade_side(&self) -> TradeSide {
        match self {
            OrderSide::BuyLimit => TradeSide::Buy,
            OrderSide::SellLimit => TradeSide::Sell,
        }
    }

    /// Buy limits fire at or below the limit, sell limits at or above it.
    pub fn is_triggered(&self, current: Price, limit: Price) -> bool {
        match self {
            OrderSide::BuyLimit => current <= limit,
            OrderSide::SellLimit => current >= limit,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY_LIMIT" => Ok(OrderSide::BuyLimit),
            "SELL_LIMIT" => Ok(OrderSide::SellLimit),
            other => Err(ValidationError::InvalidIdentifier(format!(
                "unknown order side '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Executed,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Executed => "EXECUTED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "EXECUTED" => Ok(OrderStatus::Executed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(ValidationError::InvalidIdentifier(format!(
                "unknown order status '{}'",
                other
            ))),
        }
    }
}

/// Attempted move out of a terminal state
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move order from {} to {}", self.from, self.to)
    }
}

/// Standing limit order.
///
/// Moves one way from `Pending` to exactly one of `Executed`, `Cancelled`
/// or `Failed`. The timestamp/reason fields are populated iff the matching
/// terminal state is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub side: OrderSide,
    pub quantity: Quantity,
    pub limit_price: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub execution_price: Option<Price>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl Order {
    pub fn new(
        account_id: Uuid,
        stock_id: Uuid,
        side: OrderSide,
        quantity: Quantity,
        limit_price: Price,
    ) -> Self {
        Order {
            id: Uuid::new_v4(),
            account_id,
            stock_id,
            side,
            quantity,
            limit_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
            execution_price: None,
            cancelled_at: None,
            failure_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    pub fn is_triggered_at(&self, current: Price) -> bool {
        self.side.is_triggered(current, self.limit_price)
    }

    pub fn mark_executed(
        &mut self,
        price: Price,
        at: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        self.leave_pending(OrderStatus::Executed)?;
        self.executed_at = Some(at);
        self.execution_price = Some(price);
        Ok(())
    }

    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.leave_pending(OrderStatus::Cancelled)?;
        self.cancelled_at = Some(at);
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), InvalidTransition> {
        self.leave_pending(OrderStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn leave_pending(&mut self, to: OrderStatus) -> Result<(), InvalidTransition> {
        if self.status != OrderStatus::Pending {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Check the status/field coupling, used when loading stored rows
    pub fn check_consistency(&self) -> Result<(), String> {
        let executed = self.status == OrderStatus::Executed;
        let cancelled = self.status == OrderStatus::Cancelled;
        let failed = self.status == OrderStatus::Failed;

        if executed != self.executed_at.is_some() || executed != self.execution_price.is_some() {
            return Err(format!("order {} execution fields do not match {}", self.id, self.status));
        }
        if cancelled != self.cancelled_at.is_some() {
            return Err(format!("order {} cancelledAt does not match {}", self.id, self.status));
        }
        if failed != self.failure_reason.is_some() {
            return Err(format!("order {} failureReason does not match {}", self.id, self.status));
        }
        Ok(())
    }
}
