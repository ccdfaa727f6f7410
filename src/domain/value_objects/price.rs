use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::ValidationError;
use crate::domain::value_objects::quantity::Quantity;

/// Strictly positive per-share price
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value > Decimal::ZERO {
            Ok(Price(value.normalize()))
        } else {
            Err(ValidationError::InvalidPrice(format!(
                "price must be positive, got {}",
                value
            )))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Notional value of `quantity` shares at this price
    pub fn times(&self, quantity: Quantity) -> Result<Decimal, ValidationError> {
        self.0
            .checked_mul(quantity.value())
            .ok_or_else(|| ValidationError::overflow(format_args!("{} x {}", quantity, self)))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
