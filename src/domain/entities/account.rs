//! Account entity - the cash side of the ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{TradeError, ValidationError};

/// Partial view of a brokerage account: the cash balance trades settle against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub cash_balance: Decimal,
    /// Version the record was read at; the store bumps it on every commit
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn open(initial_cash: Decimal) -> Result<Self, ValidationError> {
        if initial_cash < Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(format!(
                "cash balance must be non-negative, got {}",
                initial_cash
            )));
        }

        Ok(Account {
            id: Uuid::new_v4(),
            cash_balance: initial_cash,
            version: 0,
            created_at: Utc::now(),
        })
    }

    /// Debit cash; the balance can never go below zero.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), TradeError> {
        if self.cash_balance < amount {
            return Err(TradeError::InsufficientFunds {
                required: amount,
                available: self.cash_balance,
            });
        }
        self.cash_balance -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        self.cash_balance = self
            .cash_balance
            .checked_add(amount)
            .ok_or_else(|| ValidationError::overflow("cash balance"))?;
        Ok(())
    }
}
