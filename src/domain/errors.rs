use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::order::OrderStatus;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl ValidationError {
    /// Arithmetic on `what` left the representable decimal range
    pub fn overflow(what: impl fmt::Display) -> Self {
        ValidationError::InvalidAmount(format!("{} exceeds the representable range", what))
    }
}

impl From<ValidationError> for String {
    fn from(error: ValidationError) -> Self {
        error.to_string()
    }
}

/// Errors raised at the repository seam
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Outcome of applying one trade against the ledgers
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TradeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Stock not found: {0}")]
    StockNotFound(Uuid),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Insufficient holding: requested {requested}, held {held}")]
    InsufficientHolding { requested: Decimal, held: Decimal },

    #[error("Order {0} is no longer pending")]
    OrderNotPending(Uuid),

    #[error("Concurrent modification of account {account_id} after {attempts} attempts")]
    ConcurrentModification { account_id: Uuid, attempts: u32 },

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl TradeError {
    /// Business rejections: the request was well formed but the ledger refuses it
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TradeError::InsufficientFunds { .. } | TradeError::InsufficientHolding { .. }
        )
    }

    /// Stable code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            TradeError::Validation(_) => "ERR_VALIDATION",
            TradeError::AccountNotFound(_) => "ERR_ACCOUNT_NOT_FOUND",
            TradeError::StockNotFound(_) => "ERR_STOCK_NOT_FOUND",
            TradeError::InsufficientFunds { .. } => "ERR_INSUFFICIENT_FUNDS",
            TradeError::InsufficientHolding { .. } => "ERR_INSUFFICIENT_HOLDING",
            TradeError::OrderNotPending(_) => "ERR_ORDER_NOT_PENDING",
            TradeError::ConcurrentModification { .. } => "ERR_CONCURRENT_MODIFICATION",
            TradeError::Storage(_) => "ERR_STORAGE",
        }
    }
}

impl From<StoreError> for TradeError {
    fn from(error: StoreError) -> Self {
        TradeError::Storage(error.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {id} is {status}, not PENDING")]
    NotPending { id: Uuid, status: OrderStatus },

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Stock not found: {0}")]
    StockNotFound(Uuid),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for OrderError {
    fn from(error: StoreError) -> Self {
        OrderError::Storage(error.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DividendError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Dividend not found: {0}")]
    NotFound(Uuid),

    #[error("Stock not found: {0}")]
    StockNotFound(Uuid),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for DividendError {
    fn from(error: StoreError) -> Self {
        DividendError::Storage(error.to_string())
    }
}

/// Price feed failures. Always transient from the scheduler's point of view.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    #[error("Price unavailable for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    #[error("Price lookup for {symbol} timed out after {after_ms}ms")]
    Timeout { symbol: String, after_ms: u64 },

    #[error("Invalid price response for {symbol}: {reason}")]
    InvalidResponse { symbol: String, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotifyError {
    #[error("Notification rejected on {topic}: {reason}")]
    Rejected { topic: String, reason: String },
}

/// Severity used when logging failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Minor,
    Moderate,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Minor => write!(f, "Minor"),
            ErrorSeverity::Moderate => write!(f, "Moderate"),
            ErrorSeverity::Critical => write!(f, "Critical"),
        }
    }
}

impl TradeError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TradeError::OrderNotPending(_) => ErrorSeverity::Minor,
            TradeError::Validation(_)
            | TradeError::AccountNotFound(_)
            | TradeError::StockNotFound(_)
            | TradeError::InsufficientFunds { .. }
            | TradeError::InsufficientHolding { .. } => ErrorSeverity::Moderate,
            TradeError::ConcurrentModification { .. } | TradeError::Storage(_) => {
                ErrorSeverity::Critical
            }
        }
    }
}
