use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::entities::holding::Holding;
use crate::domain::errors::ValidationError;
use crate::domain::value_objects::price::Price;

/// Cash dividend announced for a stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dividend {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub amount_per_share: Price,
    pub pay_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Dividend {
    pub fn announce(stock_id: Uuid, amount_per_share: Price, pay_date: NaiveDate) -> Self {
        Dividend {
            id: Uuid::new_v4(),
            stock_id,
            amount_per_share,
            pay_date,
            created_at: Utc::now(),
        }
    }

    /// Payment owed to `holding` at its current quantity
    pub fn payment_for(&self, holding: &Holding) -> Result<DividendPayment, ValidationError> {
        let total_amount = holding
            .quantity
            .checked_mul(self.amount_per_share.value())
            .ok_or_else(|| ValidationError::overflow("dividend payment"))?;
        Ok(DividendPayment {
            id: Uuid::new_v4(),
            account_id: holding.account_id,
            stock_id: self.stock_id,
            dividend_id: self.id,
            share_quantity: holding.quantity,
            total_amount,
            payment_date: self.pay_date,
            status: PaymentStatus::Paid,
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(PaymentStatus::Paid),
            other => Err(ValidationError::InvalidIdentifier(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

/// One holder's share of a dividend; at most one per (account, dividend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendPayment {
    pub id: Uuid,
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub dividend_id: Uuid,
    pub share_quantity: Decimal,
    pub total_amount: Decimal,
    pub payment_date: NaiveDate,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
