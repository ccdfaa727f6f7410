//! Holding entity - an account's position in one stock with weighted
//! average cost basis accounting

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{TradeError, ValidationError};
use crate::domain::value_objects::{price::Price, quantity::Quantity};

/// Position keyed by (account, stock).
///
/// Invariants:
/// - `quantity >= 0`
/// - `total_cost_basis ≈ quantity × average_cost_basis`
/// - sells never move `average_cost_basis`
/// - `realized_gain` only changes on sells
///
/// A holding sold down to zero is kept as a closed position with quantity 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub account_id: Uuid,
    pub stock_id: Uuid,
    pub quantity: Decimal,
    pub average_cost_basis: Decimal,
    pub total_cost_basis: Decimal,
    pub realized_gain: Decimal,
    pub first_purchase_date: DateTime<Utc>,
    pub version: u64,
}

impl Holding {
    /// Position created by the first buy of a stock in an account
    pub fn open(
        account_id: Uuid,
        stock_id: Uuid,
        quantity: Quantity,
        price: Price,
        at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(Holding {
            account_id,
            stock_id,
            quantity: quantity.value(),
            average_cost_basis: price.value(),
            total_cost_basis: price.times(quantity)?,
            realized_gain: Decimal::ZERO,
            first_purchase_date: at,
            version: 0,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Add shares at `price`, recomputing the weighted average cost.
    /// Leaves the holding untouched when the result is out of range.
    pub fn apply_buy(&mut self, quantity: Quantity, price: Price) -> Result<(), ValidationError> {
        let cost = price.times(quantity)?;
        let new_quantity = self
            .quantity
            .checked_add(quantity.value())
            .ok_or_else(|| ValidationError::overflow("holding quantity"))?;
        let new_total = self
            .total_cost_basis
            .checked_add(cost)
            .ok_or_else(|| ValidationError::overflow("total cost basis"))?;
        let new_average = new_total
            .checked_div(new_quantity)
            .ok_or_else(|| ValidationError::overflow("average cost basis"))?;

        self.quantity = new_quantity;
        self.total_cost_basis = new_total;
        self.average_cost_basis = new_average;
        Ok(())
    }

    /// Remove shares at `price`. Returns the realized gain of this sell.
    pub fn apply_sell(&mut self, quantity: Quantity, price: Price) -> Result<Decimal, TradeError> {
        if self.quantity < quantity.value() {
            return Err(TradeError::InsufficientHolding {
                requested: quantity.value(),
                held: self.quantity,
            });
        }

        let gain = price
            .value()
            .checked_sub(self.average_cost_basis)
            .and_then(|spread| spread.checked_mul(quantity.value()))
            .ok_or_else(|| ValidationError::overflow("realized gain"))?;
        let new_quantity = self.quantity - quantity.value();
        let new_total = self
            .average_cost_basis
            .checked_mul(new_quantity)
            .ok_or_else(|| ValidationError::overflow("total cost basis"))?;
        let new_realized = self
            .realized_gain
            .checked_add(gain)
            .ok_or_else(|| ValidationError::overflow("realized gain"))?;

        self.quantity = new_quantity;
        self.total_cost_basis = new_total;
        self.realized_gain = new_realized;
        Ok(gain)
    }
}
