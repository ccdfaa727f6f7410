use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::ValidationError;

const MAX_SYMBOL_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: Uuid,
    pub symbol: String,
}

impl Stock {
    pub fn new(symbol: &str) -> Result<Self, ValidationError> {
        Ok(Stock {
            id: Uuid::new_v4(),
            symbol: Self::normalize_symbol(symbol)?,
        })
    }

    /// Trim and uppercase; letters, digits, '.' and '-' only
    pub fn normalize_symbol(symbol: &str) -> Result<String, ValidationError> {
        let normalized = symbol.trim().to_uppercase();

        if normalized.is_empty() || normalized.len() > MAX_SYMBOL_LEN {
            return Err(ValidationError::InvalidSymbol(format!(
                "symbol must be 1-{} characters, got '{}'",
                MAX_SYMBOL_LEN, symbol
            )));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(ValidationError::InvalidSymbol(format!(
                "symbol contains invalid characters: '{}'",
                symbol
            )));
        }

        Ok(normalized)
    }
}
