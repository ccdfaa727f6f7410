//! HTTP handlers. Each maps its layer's error enum onto a status code and
//! an `{ "error": .. }` body.

pub mod account_handler;
pub mod dividend_handler;
pub mod order_handler;
pub mod scheduler_handler;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DividendError, OrderError, TradeError};

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

pub(crate) fn trade_error(error: TradeError) -> ApiError {
    let status = match &error {
        TradeError::Validation(_) => StatusCode::BAD_REQUEST,
        TradeError::AccountNotFound(_) | TradeError::StockNotFound(_) => StatusCode::NOT_FOUND,
        TradeError::InsufficientFunds { .. }
        | TradeError::InsufficientHolding { .. }
        | TradeError::OrderNotPending(_)
        | TradeError::ConcurrentModification { .. } => StatusCode::CONFLICT,
        TradeError::Storage(_) => {
            tracing::error!(code = error.error_code(), "Trade failed: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, error)
}

pub(crate) fn order_error(error: OrderError) -> ApiError {
    let status = match &error {
        OrderError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderError::NotFound(_) | OrderError::AccountNotFound(_) | OrderError::StockNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        OrderError::NotPending { .. } => StatusCode::CONFLICT,
        OrderError::Storage(_) => {
            tracing::error!("Order request failed: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, error)
}

pub(crate) fn dividend_error(error: DividendError) -> ApiError {
    let status = match &error {
        DividendError::Validation(_) => StatusCode::BAD_REQUEST,
        DividendError::NotFound(_) | DividendError::StockNotFound(_) => StatusCode::NOT_FOUND,
        DividendError::Storage(_) => {
            tracing::error!("Dividend request failed: {}", error);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, error)
}
