use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::{api_error, ApiError};
use crate::api::AppState;
use crate::application::actors::order_scheduler::{SchedulerError, TickSummary};

/// Run one scheduler tick now and return its summary
pub async fn run_scheduler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TickSummary>, ApiError> {
    match state.scheduler.run_now().await {
        Ok(summary) => Ok(Json(summary)),
        Err(e @ SchedulerError::Stopped) => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e)),
        Err(e @ SchedulerError::TickFailed(_)) => {
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}
