use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{dividend_error, ApiError};
use crate::api::AppState;
use crate::application::services::dividend_service::{AnnounceDividend, Announcement};
use crate::domain::entities::dividend::DividendPayment;
use crate::domain::services::dividend_distributor::DistributionSummary;

/// Announce a dividend and pay every current holder before responding
pub async fn announce_dividend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnnounceDividend>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    let announcement = state
        .dividends
        .announce_dividend(request)
        .await
        .map_err(dividend_error)?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Path(dividend_id): Path<Uuid>,
) -> Result<Json<Vec<DividendPayment>>, ApiError> {
    state
        .dividends
        .payments_for(dividend_id)
        .await
        .map(Json)
        .map_err(dividend_error)
}

/// Re-run distribution for an existing dividend; holders already paid are skipped
pub async fn distribute_dividend(
    State(state): State<Arc<AppState>>,
    Path(dividend_id): Path<Uuid>,
) -> Result<Json<DistributionSummary>, ApiError> {
    state
        .dividends
        .redistribute(dividend_id)
        .await
        .map(Json)
        .map_err(dividend_error)
}
