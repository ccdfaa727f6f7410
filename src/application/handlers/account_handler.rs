use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{trade_error, ApiError};
use crate::api::AppState;
use crate::application::services::ledger_service::DirectTrade;
use crate::domain::entities::{
    account::Account, holding::Holding, stock::Stock, transaction::Transaction,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub cash_balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct RegisterStockRequest {
    pub symbol: String,
}

pub async fn open_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state
        .ledger
        .open_account(request.cash_balance)
        .await
        .map_err(trade_error)?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, ApiError> {
    state
        .ledger
        .get_account(account_id)
        .await
        .map(Json)
        .map_err(trade_error)
}

pub async fn register_stock(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterStockRequest>,
) -> Result<(StatusCode, Json<Stock>), ApiError> {
    let stock = state
        .ledger
        .register_stock(&request.symbol)
        .await
        .map_err(trade_error)?;
    Ok((StatusCode::CREATED, Json(stock)))
}

/// Apply a trade immediately, bypassing the order book
pub async fn execute_trade(
    State(state): State<Arc<AppState>>,
    Json(trade): Json<DirectTrade>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let transaction = state.ledger.trade(trade).await.map_err(trade_error)?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn list_holdings(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Holding>>, ApiError> {
    state
        .ledger
        .holdings(account_id)
        .await
        .map(Json)
        .map_err(trade_error)
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    state
        .ledger
        .transactions(account_id)
        .await
        .map(Json)
        .map_err(trade_error)
}
