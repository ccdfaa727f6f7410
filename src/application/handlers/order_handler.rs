use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::{order_error, ApiError};
use crate::api::AppState;
use crate::application::services::order_service::PlaceOrder;
use crate::domain::entities::order::Order;

/// Query parameters for an account's order listing
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    /// Only PENDING orders when true (default false)
    pub pending: Option<bool>,
}

pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.orders.place_order(request).await.map_err(order_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    state
        .orders
        .get_order(order_id)
        .await
        .map(Json)
        .map_err(order_error)
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    state
        .orders
        .cancel_order(order_id)
        .await
        .map(Json)
        .map_err(order_error)
}

pub async fn list_account_orders(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
    Query(params): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    state
        .orders
        .list_orders(account_id, params.pending.unwrap_or(false))
        .await
        .map(Json)
        .map_err(order_error)
}
