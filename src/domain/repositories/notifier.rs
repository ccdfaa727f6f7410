//! Notifier Trait
//!
//! Narrow publish seam for execution and payment events. Topic convention:
//! `orders.<accountId>` for executions, `dividends.<accountId>` for payments.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::order::OrderSide;
use crate::domain::errors::NotifyError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderExecutedEvent {
    pub order_id: Uuid,
    pub account_id: Uuid,
    pub stock_symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub execution_price: Decimal,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPaidEvent {
    pub payment_id: Uuid,
    pub dividend_id: Uuid,
    pub account_id: Uuid,
    pub stock_symbol: String,
    pub share_quantity: Decimal,
    pub total_amount: Decimal,
    pub payment_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    OrderExecuted(OrderExecutedEvent),
    DividendPaid(DividendPaidEvent),
}

impl NotificationEvent {
    pub fn topic(&self) -> String {
        match self {
            NotificationEvent::OrderExecuted(e) => order_topic(e.account_id),
            NotificationEvent::DividendPaid(e) => dividend_topic(e.account_id),
        }
    }
}

pub fn order_topic(account_id: Uuid) -> String {
    format!("orders.{}", account_id)
}

pub fn dividend_topic(account_id: Uuid) -> String {
    format!("dividends.{}", account_id)
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, event: &NotificationEvent) -> Result<(), NotifyError>;
}
